//! Reservation ledger: the authoritative record of who holds what.

use std::collections::{HashMap, hash_map::Entry};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{LendingError, Result};

/// An active loan of one resource to one holder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reservation {
    /// Borrowed resource
    pub resource_id: String,
    /// Current holder
    pub holder_id: String,
    /// When the loan started
    pub borrowed_at: DateTime<Utc>,
    /// When the resource must be back
    pub due_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether the due date has passed at `now`
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now > self.due_at
    }
}

/// Storage for active reservations, at most one per resource
pub trait Ledger: Send + Sync {
    /// Record a new reservation
    ///
    /// # Errors
    ///
    /// Returns `LendingError::AlreadyReserved` if the resource already has one
    fn reserve(
        &self,
        resource_id: &str,
        holder_id: &str,
        borrowed_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Remove the reservation if `holder_id` holds it.
    ///
    /// Returns `Ok(false)` and leaves the ledger untouched on a holder mismatch.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotFound` if the resource has no reservation
    fn release(&self, resource_id: &str, holder_id: &str) -> Result<bool>;

    /// Resource ids currently held by `holder_id`, in reservation order
    fn find_by_holder(&self, holder_id: &str) -> Vec<String>;

    /// The reservation for a resource, if any
    fn get(&self, resource_id: &str) -> Option<Reservation>;

    /// Every active reservation, in reservation order
    fn reservations(&self) -> Vec<Reservation>;

    /// Remove a reservation regardless of holder
    fn evict(&self, resource_id: &str) -> Option<Reservation>;
}

/// A ledger entry tagged with its insertion sequence
#[derive(Debug, Clone)]
struct Slot {
    /// Monotonic insertion number
    seq: u64,
    /// The stored reservation
    reservation: Reservation,
}

/// Mutable ledger state behind the lock
#[derive(Debug, Default)]
struct Entries {
    /// Reservations keyed by resource id
    by_resource: HashMap<String, Slot>,
    /// Sequence number for the next insertion
    next_seq: u64,
}

impl Entries {
    /// Matching reservations sorted by insertion order
    fn ordered<F>(&self, keep: F) -> Vec<&Reservation>
    where
        F: Fn(&Reservation) -> bool,
    {
        let mut slots: Vec<&Slot> =
            self.by_resource.values().filter(|slot| keep(&slot.reservation)).collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| &slot.reservation).collect()
    }
}

/// `HashMap`-backed ledger that remembers insertion order
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Guarded ledger state
    entries: RwLock<Entries>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for InMemoryLedger {
    fn reserve(
        &self,
        resource_id: &str,
        holder_id: &str,
        borrowed_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut entries = self.entries.write();
        let seq = entries.next_seq;
        match entries.by_resource.entry(resource_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(LendingError::AlreadyReserved(resource_id.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot {
                    seq,
                    reservation: Reservation {
                        resource_id: resource_id.to_string(),
                        holder_id: holder_id.to_string(),
                        borrowed_at,
                        due_at,
                    },
                });
            }
        }
        entries.next_seq = seq.wrapping_add(1);
        Ok(())
    }

    fn release(&self, resource_id: &str, holder_id: &str) -> Result<bool> {
        let mut entries = self.entries.write();
        match entries.by_resource.entry(resource_id.to_string()) {
            Entry::Vacant(_) => Err(LendingError::NotFound(resource_id.to_string())),
            Entry::Occupied(slot) if slot.get().reservation.holder_id == holder_id => {
                slot.remove();
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    fn find_by_holder(&self, holder_id: &str) -> Vec<String> {
        self.entries
            .read()
            .ordered(|r| r.holder_id == holder_id)
            .into_iter()
            .map(|r| r.resource_id.clone())
            .collect()
    }

    fn get(&self, resource_id: &str) -> Option<Reservation> {
        self.entries.read().by_resource.get(resource_id).map(|slot| slot.reservation.clone())
    }

    fn reservations(&self) -> Vec<Reservation> {
        self.entries.read().ordered(|_| true).into_iter().cloned().collect()
    }

    fn evict(&self, resource_id: &str) -> Option<Reservation> {
        self.entries.write().by_resource.remove(resource_id).map(|slot| slot.reservation)
    }
}
