//! Per-resource mutual exclusion.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

/// One mutex per resource id, alive only while someone uses it.
///
/// A handle is cloned out of the map under the shard lock and removed under
/// the same shard lock only when the map holds the last reference, so two
/// callers on one id always share one mutex.
#[derive(Debug, Default)]
pub(crate) struct ResourceLocks {
    /// Lock handles keyed by resource id
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ResourceLocks {
    /// Run `f` while holding the lock for `resource_id`
    pub(crate) fn with_lock<T>(&self, resource_id: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(resource_id);
        let result = {
            let _guard = handle.lock();
            f()
        };
        drop(handle);
        drop(self.locks.remove_if(resource_id, |_, h| Arc::strong_count(h) == 1));
        result
    }

    /// Shared lock handle for `resource_id`, created on first use
    fn handle(&self, resource_id: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.get(resource_id) {
            return Arc::clone(existing.value());
        }
        Arc::clone(self.locks.entry(resource_id.to_string()).or_default().value())
    }

    /// Number of live handles
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }

    /// References to the handle of `resource_id`, including the map's own
    #[cfg(test)]
    pub(crate) fn holders(&self, resource_id: &str) -> usize {
        self.locks.get(resource_id).map_or(0, |h| Arc::strong_count(h.value()))
    }
}
