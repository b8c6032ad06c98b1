use serde::{Deserialize, Serialize};

/// Events that can cause an availability transition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LendingEvent {
    /// A holder borrowed the resource
    Borrow(String),
    /// A holder returned the resource
    Return(String),
    /// The resource was reported lost
    ReportLost,
    /// A lost resource has been found
    Found,
    /// Reconciliation repaired the status from the ledger
    Reconcile,
}
