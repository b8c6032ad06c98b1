use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    availability::Availability,
    catalog::{Catalog, InMemoryCatalog},
    clock::{Clock, SystemClock},
    config::{LendingConfig, OverduePolicy},
    error::{LendingError, Result},
    events::LendingEvent,
    ledger::{InMemoryLedger, Ledger, Reservation},
    locks::ResourceLocks,
    notifier::Notifier,
    observers::TransitionObserver,
    resource::{Holder, Resource},
};

/// A recorded availability change of one resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transition {
    /// Resource whose status changed
    pub resource_id: String,
    /// Status before the change
    pub from: Availability,
    /// Status after the change
    pub to: Availability,
    /// The event that triggered the change
    pub event: LendingEvent,
    /// When the change happened
    pub at: DateTime<Utc>,
}

/// Point-in-time view of both stores
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Snapshot {
    /// Every catalogued resource, sorted by id
    pub resources: Vec<Resource>,
    /// Every active reservation, in reservation order
    pub reservations: Vec<Reservation>,
}

/// Repairs made by [`LendingService::reconcile`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconcileReport {
    /// Ledger entries whose resource is no longer catalogued or is lost
    pub dropped_reservations: Vec<Reservation>,
    /// Resources that had a ledger entry but were not marked borrowed
    pub marked_borrowed: Vec<String>,
    /// Resources marked borrowed without a ledger entry
    pub marked_available: Vec<String>,
}

impl ReconcileReport {
    /// Whether nothing needed repairing
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped_reservations.is_empty()
            && self.marked_borrowed.is_empty()
            && self.marked_available.is_empty()
    }
}

/// What a successful borrow hands back out of the resource lock
#[derive(Debug)]
struct Loan {
    /// Title used in the confirmation message
    title: String,
    /// Due date used in the confirmation message
    due_at: DateTime<Utc>,
    /// The recorded status change
    transition: Transition,
}

/// Lending orchestration over a catalog and a ledger.
///
/// The service is the only writer of both stores. Every mutating operation
/// on a resource runs under that resource's lock; notifications and
/// observers run after the lock is released.
pub struct LendingService<C, L> {
    /// Resource records
    catalog: C,
    /// Active reservations
    ledger: L,
    /// Borrow confirmations go here
    notifier: Box<dyn Notifier>,
    /// Source of `now` for due dates
    clock: Box<dyn Clock>,
    /// Lending policy
    config: LendingConfig,
    /// Per-resource mutual exclusion
    locks: ResourceLocks,
    /// Most recent transitions, oldest first
    history: Mutex<VecDeque<Transition>>,
    /// Registered transition observers
    observers: Vec<Box<dyn TransitionObserver>>,
}

// Manual implementation of Debug for LendingService
impl<C: fmt::Debug, L: fmt::Debug> fmt::Debug for LendingService<C, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LendingService")
            .field("catalog", &self.catalog)
            .field("ledger", &self.ledger)
            .field("config", &self.config)
            .field("locks", &self.locks)
            .field("history_len", &self.history.lock().len())
            .field("observers_count", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl LendingService<InMemoryCatalog, InMemoryLedger> {
    /// Create a service over fresh in-memory stores
    #[must_use]
    pub fn in_memory(notifier: Box<dyn Notifier>, config: LendingConfig) -> Self {
        Self::new(InMemoryCatalog::new(), InMemoryLedger::new(), notifier, config)
    }
}

impl<C: Catalog, L: Ledger> LendingService<C, L> {
    /// Create a service over the given stores, using the system clock
    #[must_use]
    pub fn new(catalog: C, ledger: L, notifier: Box<dyn Notifier>, config: LendingConfig) -> Self {
        Self {
            catalog,
            ledger,
            notifier,
            clock: Box::new(SystemClock),
            config,
            locks: ResourceLocks::default(),
            history: Mutex::new(VecDeque::new()),
            observers: Vec::new(),
        }
    }

    /// Replace the clock used for due dates
    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an observer to be notified of status changes
    pub fn register_observer(&mut self, observer: Box<dyn TransitionObserver>) {
        self.observers.push(observer);
    }

    /// The catalog this service writes to
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The ledger this service writes to
    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Active lending policy
    #[must_use]
    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// Add a resource to the catalog.
    ///
    /// Anything other than `Lost` is stored as `Available`, since a new
    /// resource has no reservation.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::DuplicateResource` if the id is already catalogued
    pub fn add_resource(&self, mut resource: Resource) -> Result<()> {
        if resource.availability != Availability::Lost {
            resource.availability = Availability::Available;
        }
        let id = resource.id.clone();
        self.locks.with_lock(&id, || {
            debug!(resource_id = %resource.id, title = %resource.title, "Adding resource");
            self.catalog.add(resource)
        })
    }

    /// Remove a resource that nobody holds
    ///
    /// # Errors
    ///
    /// Returns `LendingError::ResourceInUse` if the resource is reserved, or
    /// `LendingError::NotFound` if it is not catalogued
    pub fn remove_resource(&self, resource_id: &str) -> Result<Resource> {
        let removed = self.locks.with_lock(resource_id, || -> Result<Resource> {
            if self.ledger.get(resource_id).is_some() {
                return Err(LendingError::ResourceInUse(resource_id.to_string()));
            }
            self.catalog.remove(resource_id)
        })?;
        debug!(%resource_id, "Removed resource");
        Ok(removed)
    }

    /// Look up a resource
    #[must_use]
    pub fn get_resource(&self, resource_id: &str) -> Option<Resource> {
        self.catalog.get(resource_id)
    }

    /// Current availability of a resource
    #[must_use]
    pub fn status(&self, resource_id: &str) -> Option<Availability> {
        self.catalog.get(resource_id).map(|r| r.availability)
    }

    /// Lend a resource to a holder.
    ///
    /// Returns `Ok(false)` without touching any state if the resource is
    /// missing or not available, or if the overdue policy blocks the holder.
    /// On success the holder is notified after the resource lock is released;
    /// a notification failure is logged and does not undo the loan.
    ///
    /// # Errors
    ///
    /// Returns an error only if the catalog rejects the status update, in
    /// which case the reservation is rolled back
    pub fn borrow(&self, resource_id: &str, holder_id: &str, holder_contact: &str) -> Result<bool> {
        let outcome = self.locks.with_lock(resource_id, || -> Result<Option<Loan>> {
            let Some(resource) = self.catalog.get(resource_id) else {
                debug!(%resource_id, %holder_id, "Borrow rejected: unknown resource");
                return Ok(None);
            };
            if !resource.availability.is_lendable() {
                debug!(
                    %resource_id,
                    %holder_id,
                    status = %resource.availability,
                    "Borrow rejected: not available"
                );
                return Ok(None);
            }

            let now = self.clock.now();
            if self.config.overdue_policy == OverduePolicy::BlockHolder
                && self.holder_has_overdue(holder_id, now)
            {
                debug!(%resource_id, %holder_id, "Borrow rejected: holder has overdue loans");
                return Ok(None);
            }

            let due_at = now
                .checked_add_signed(self.config.loan_period())
                .unwrap_or(DateTime::<Utc>::MAX_UTC);

            match self.ledger.reserve(resource_id, holder_id, now, due_at) {
                Ok(()) => {}
                Err(LendingError::AlreadyReserved(id)) => {
                    error!(
                        resource_id = %id,
                        %holder_id,
                        "Ledger already holds a reservation for an available resource"
                    );
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }

            if let Err(e) = self.catalog.set_availability(resource_id, Availability::Borrowed) {
                drop(self.ledger.evict(resource_id));
                return Err(e);
            }

            let transition = self.record(
                resource_id,
                resource.availability,
                Availability::Borrowed,
                LendingEvent::Borrow(holder_id.to_string()),
                now,
            );
            Ok(Some(Loan { title: resource.title, due_at, transition }))
        })?;

        let Some(Loan { title, due_at, transition }) = outcome else {
            return Ok(false);
        };

        self.announce(&transition);

        let message = format!("You have borrowed {title}. Due date: {}", due_at.date_naive());
        if let Err(e) = self.notifier.notify(holder_contact, &message) {
            warn!(%resource_id, %holder_id, error = %e, "Borrow notification failed");
        }

        info!(%resource_id, %holder_id, %due_at, "Resource borrowed");
        Ok(true)
    }

    /// Lend a resource to a known holder
    ///
    /// # Errors
    ///
    /// See [`LendingService::borrow`]
    pub fn borrow_for(&self, resource_id: &str, holder: &Holder) -> Result<bool> {
        self.borrow(resource_id, &holder.id, &holder.contact)
    }

    /// Take a resource back from its holder.
    ///
    /// Returns `Ok(false)` without touching any state if the resource is not
    /// on loan or `holder_id` is not the one holding it.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotFound` if the reservation was released but the
    /// resource has vanished from the catalog
    pub fn return_resource(&self, resource_id: &str, holder_id: &str) -> Result<bool> {
        let outcome = self.locks.with_lock(resource_id, || -> Result<Option<Transition>> {
            match self.ledger.release(resource_id, holder_id) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(%resource_id, %holder_id, "Return rejected: not the holder");
                    return Ok(None);
                }
                Err(LendingError::NotFound(_)) => {
                    debug!(%resource_id, %holder_id, "Return rejected: no active reservation");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }

            let from = self.status(resource_id).unwrap_or(Availability::Borrowed);
            self.catalog.set_availability(resource_id, Availability::Available)?;
            Ok(Some(self.record(
                resource_id,
                from,
                Availability::Available,
                LendingEvent::Return(holder_id.to_string()),
                self.clock.now(),
            )))
        })?;

        let Some(transition) = outcome else {
            return Ok(false);
        };

        self.announce(&transition);
        info!(%resource_id, %holder_id, "Resource returned");
        Ok(true)
    }

    /// Resources currently held by `holder_id`, in borrowing order.
    ///
    /// Ids the catalog cannot resolve are skipped.
    #[must_use]
    pub fn list_borrowed(&self, holder_id: &str) -> Vec<Resource> {
        self.ledger
            .find_by_holder(holder_id)
            .iter()
            .filter_map(|id| {
                let resource = self.catalog.get(id);
                if resource.is_none() {
                    debug!(
                        resource_id = %id,
                        %holder_id,
                        "Skipping reservation for uncatalogued resource"
                    );
                }
                resource
            })
            .collect()
    }

    /// Reservations whose due date has passed
    #[must_use]
    pub fn overdue(&self) -> Vec<Reservation> {
        let now = self.clock.now();
        self.ledger.reservations().into_iter().filter(|r| r.is_overdue(now)).collect()
    }

    /// Whether `holder_id` keeps any resource past its due date
    fn holder_has_overdue(&self, holder_id: &str, now: DateTime<Utc>) -> bool {
        self.ledger
            .find_by_holder(holder_id)
            .iter()
            .filter_map(|id| self.ledger.get(id))
            .any(|r| r.is_overdue(now))
    }

    /// Report a resource as lost, ending any active loan.
    ///
    /// Returns the reservation that was dropped, if the resource was on loan.
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotFound` for unknown resources and
    /// `LendingError::InvalidTransition` if the resource is already lost
    pub fn mark_lost(&self, resource_id: &str) -> Result<Option<Reservation>> {
        let (dropped, transition) = self.locks.with_lock(resource_id, || -> Result<_> {
            let from = self
                .status(resource_id)
                .ok_or_else(|| LendingError::NotFound(resource_id.to_string()))?;
            if from == Availability::Lost {
                return Err(LendingError::InvalidTransition {
                    resource_id: resource_id.to_string(),
                    from,
                    event: LendingEvent::ReportLost,
                });
            }
            self.catalog.set_availability(resource_id, Availability::Lost)?;
            let dropped = self.ledger.evict(resource_id);
            let transition = self.record(
                resource_id,
                from,
                Availability::Lost,
                LendingEvent::ReportLost,
                self.clock.now(),
            );
            Ok((dropped, transition))
        })?;

        self.announce(&transition);
        if let Some(reservation) = &dropped {
            warn!(%resource_id, holder_id = %reservation.holder_id, "Resource lost while on loan");
        }
        Ok(dropped)
    }

    /// Put a lost resource back into circulation
    ///
    /// # Errors
    ///
    /// Returns `LendingError::NotFound` for unknown resources and
    /// `LendingError::InvalidTransition` if the resource is not lost
    pub fn mark_found(&self, resource_id: &str) -> Result<()> {
        let transition = self.locks.with_lock(resource_id, || -> Result<Transition> {
            let from = self
                .status(resource_id)
                .ok_or_else(|| LendingError::NotFound(resource_id.to_string()))?;
            if from != Availability::Lost {
                return Err(LendingError::InvalidTransition {
                    resource_id: resource_id.to_string(),
                    from,
                    event: LendingEvent::Found,
                });
            }
            self.catalog.set_availability(resource_id, Availability::Available)?;
            Ok(self.record(
                resource_id,
                from,
                Availability::Available,
                LendingEvent::Found,
                self.clock.now(),
            ))
        })?;

        self.announce(&transition);
        Ok(())
    }

    /// Bring the catalog back in line with the ledger.
    ///
    /// The ledger is authoritative for loans: entries for uncatalogued or
    /// `Lost` resources are dropped, other resources with an entry become
    /// `Borrowed`, and `Borrowed` resources without one become `Available`.
    /// A `Lost` status is never undone here.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog rejects a status update
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut transitions = Vec::new();

        for reservation in self.ledger.reservations() {
            let id = reservation.resource_id.as_str();
            self.locks.with_lock(id, || -> Result<()> {
                match self.status(id) {
                    None => {
                        error!(
                            resource_id = %id,
                            holder_id = %reservation.holder_id,
                            "Dropping reservation for uncatalogued resource"
                        );
                        report.dropped_reservations.extend(self.ledger.evict(id));
                    }
                    Some(Availability::Lost) => {
                        error!(
                            resource_id = %id,
                            holder_id = %reservation.holder_id,
                            "Dropping reservation for lost resource"
                        );
                        report.dropped_reservations.extend(self.ledger.evict(id));
                    }
                    Some(Availability::Borrowed) => {}
                    Some(from) => {
                        error!(
                            resource_id = %id,
                            status = %from,
                            "Reservation found for resource not marked borrowed"
                        );
                        self.catalog.set_availability(id, Availability::Borrowed)?;
                        transitions.push(self.record(
                            id,
                            from,
                            Availability::Borrowed,
                            LendingEvent::Reconcile,
                            self.clock.now(),
                        ));
                        report.marked_borrowed.push(id.to_string());
                    }
                }
                Ok(())
            })?;
        }

        for id in self.catalog.ids() {
            self.locks.with_lock(&id, || -> Result<()> {
                if self.status(&id) == Some(Availability::Borrowed)
                    && self.ledger.get(&id).is_none()
                {
                    error!(resource_id = %id, "Resource marked borrowed without a reservation");
                    self.catalog.set_availability(&id, Availability::Available)?;
                    transitions.push(self.record(
                        &id,
                        Availability::Borrowed,
                        Availability::Available,
                        LendingEvent::Reconcile,
                        self.clock.now(),
                    ));
                    report.marked_available.push(id.clone());
                }
                Ok(())
            })?;
        }

        for transition in &transitions {
            self.announce(transition);
        }
        Ok(report)
    }

    /// Point-in-time copy of resources and reservations
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut resources: Vec<Resource> =
            self.catalog.ids().iter().filter_map(|id| self.catalog.get(id)).collect();
        resources.sort_by(|a, b| a.id.cmp(&b.id));
        Snapshot { resources, reservations: self.ledger.reservations() }
    }

    /// The retained transition history, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<Transition> {
        self.history.lock().iter().cloned().collect()
    }

    /// Append a transition to the bounded history
    fn record(
        &self,
        resource_id: &str,
        from: Availability,
        to: Availability,
        event: LendingEvent,
        at: DateTime<Utc>,
    ) -> Transition {
        let transition = Transition { resource_id: resource_id.to_string(), from, to, event, at };

        let mut history = self.history.lock();
        history.push_back(transition.clone());
        // Maintain history size limit
        while history.len() > self.config.history_limit {
            history.pop_front();
        }

        transition
    }

    /// Tell every observer about a transition
    fn announce(&self, transition: &Transition) {
        for observer in &self.observers {
            observer.on_transition(
                &transition.resource_id,
                transition.from,
                transition.to,
                &transition.event,
            );
        }
    }
}

impl<C: Catalog, L: Ledger> fmt::Display for LendingService<C, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resources, {} on loan",
            self.catalog.len(),
            self.ledger.reservations().len()
        )
    }
}
