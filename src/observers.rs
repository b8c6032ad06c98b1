use tracing::{debug, info};

use crate::{availability::Availability, events::LendingEvent};

/// Trait for availability change observation
pub trait TransitionObserver: Send + Sync {
    /// Called after a resource changed status and its lock was released
    fn on_transition(
        &self,
        resource_id: &str,
        from: Availability,
        to: Availability,
        event: &LendingEvent,
    );
}

/// Logs all transitions that occur in the system
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionLogger;

impl TransitionObserver for TransitionLogger {
    fn on_transition(
        &self,
        resource_id: &str,
        from: Availability,
        to: Availability,
        event: &LendingEvent,
    ) {
        match (from, to, event) {
            (Availability::Available, Availability::Borrowed, LendingEvent::Borrow(holder)) => {
                info!(%resource_id, %holder, "Resource has been borrowed");
            }
            (Availability::Borrowed, Availability::Available, LendingEvent::Return(holder)) => {
                info!(%resource_id, %holder, "Resource has been returned");
            }
            _ => debug!(%resource_id, %from, %to, ?event, "Transition occurred"),
        }
    }
}
