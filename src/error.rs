use thiserror::Error;

use crate::{availability::Availability, events::LendingEvent};

/// Result type used throughout the lending engine
pub type Result<T, E = LendingError> = std::result::Result<T, E>;

/// Errors raised by the catalog, the ledger and the lending service
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LendingError {
    /// The referenced resource or reservation does not exist
    #[error("no entry found for resource {0}")]
    NotFound(String),
    /// A resource with the same id is already catalogued
    #[error("resource {0} is already in the catalog")]
    DuplicateResource(String),
    /// The resource already has an active reservation
    #[error("resource {0} already has an active reservation")]
    AlreadyReserved(String),
    /// The resource cannot be removed while a reservation references it
    #[error("resource {0} is referenced by an active reservation")]
    ResourceInUse(String),
    /// The event cannot be applied from the current status
    #[error("cannot process event {event:?} for resource {resource_id} from status {from}")]
    InvalidTransition {
        /// Resource the event was applied to
        resource_id: String,
        /// Status the resource was in
        from: Availability,
        /// Rejected event
        event: LendingEvent,
    },
    /// The configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure reported by a notification sink
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The contact cannot be addressed on this channel
    #[error("invalid contact {contact:?} for {channel} delivery")]
    InvalidContact {
        /// Delivery channel name
        channel: &'static str,
        /// Rejected contact
        contact: String,
    },
    /// Delivery failed downstream
    #[error("{channel} delivery failed: {reason}")]
    Delivery {
        /// Delivery channel name
        channel: &'static str,
        /// Reason reported by the channel
        reason: String,
    },
}
