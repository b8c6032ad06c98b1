//! Resource lending engine for tracking borrowable items such as library books.
//!
//! The crate is split into two independently testable stores (the
//! [`Catalog`] of resources and the [`Ledger`] of active reservations), an
//! abstract [`Notifier`] sink, and the [`LendingService`] that orchestrates
//! them while holding a per-resource lock.

pub mod availability;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
mod locks;
pub mod notifier;
pub mod observers;
pub mod report;
pub mod resource;
pub mod service;

pub use availability::Availability;
pub use catalog::{Catalog, InMemoryCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LendingConfig, OverduePolicy};
pub use error::{LendingError, NotifyError, Result};
pub use events::LendingEvent;
pub use ledger::{InMemoryLedger, Ledger, Reservation};
pub use notifier::{
    CompositeNotifier, EmailNotifier, NoopNotifier, Notifier, RecordingNotifier, SmsNotifier,
};
pub use observers::{TransitionLogger, TransitionObserver};
pub use report::LendingReport;
pub use resource::{Holder, Resource};
pub use service::{LendingService, ReconcileReport, Snapshot, Transition};
