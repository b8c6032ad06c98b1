use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    availability::Availability,
    events::LendingEvent,
    service::{Snapshot, Transition},
};

/// Text renderings of lending state for terminals and markdown
#[derive(Debug)]
pub struct LendingReport;

impl LendingReport {
    /// Generate a markdown table of the transition history
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn history_table(transitions: &[Transition]) -> String {
        if transitions.is_empty() {
            return "No transitions recorded yet.".to_string();
        }

        let mut table = String::from("| # | Resource | From | Event | To |\n");
        table.push_str("|---|----------|------|-------|----|\n");

        for (i, transition) in transitions.iter().enumerate() {
            table.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                i + 1,
                transition.resource_id,
                transition.from,
                Self::format_event(&transition.event),
                transition.to
            ));
        }

        table
    }

    /// Generate a markdown table of active loans, flagging overdue ones
    #[must_use]
    pub fn loan_table(snapshot: &Snapshot, now: DateTime<Utc>) -> String {
        if snapshot.reservations.is_empty() {
            return "No active loans.".to_string();
        }

        let mut table = String::from("| Resource | Title | Holder | Due | Overdue |\n");
        table.push_str("|----------|-------|--------|-----|---------|\n");

        for reservation in &snapshot.reservations {
            let title = snapshot
                .resources
                .iter()
                .find(|r| r.id == reservation.resource_id)
                .map_or("?", |r| r.title.as_str());
            let overdue = if reservation.is_overdue(now) { "yes" } else { "no" };
            table.push_str(&format!(
                "| {} | {title} | {} | {} | {overdue} |\n",
                reservation.resource_id,
                reservation.holder_id,
                reservation.due_at.date_naive()
            ));
        }

        table
    }

    /// Count resources per availability status
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn status_counts(snapshot: &Snapshot) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        let all = [
            Availability::Available,
            Availability::Borrowed,
            Availability::Reserved,
            Availability::Lost,
        ];
        for status in all {
            counts.insert(status.to_string(), 0);
        }
        for resource in &snapshot.resources {
            *counts.entry(resource.availability.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Format an event for display
    fn format_event(event: &LendingEvent) -> String {
        match event {
            LendingEvent::Borrow(holder) => format!("borrow by {holder}"),
            LendingEvent::Return(holder) => format!("return by {holder}"),
            LendingEvent::ReportLost => "reported lost".to_string(),
            LendingEvent::Found => "found".to_string(),
            LendingEvent::Reconcile => "reconciled".to_string(),
        }
    }
}
