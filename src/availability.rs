use std::fmt;

use serde::{Deserialize, Serialize};

/// Availability status of a catalogued resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Resource can be borrowed
    #[default]
    Available,
    /// Resource is on loan to a holder
    Borrowed,
    /// Resource is held back for a holder but not yet on loan
    Reserved,
    /// Resource has been reported lost
    Lost,
}

impl Availability {
    /// Get a human-readable description of the status
    #[must_use]
    pub fn get_description(self) -> &'static str {
        match self {
            Self::Available => "Resource is available for borrowing",
            Self::Borrowed => "Resource is on loan",
            Self::Reserved => "Resource is reserved",
            Self::Lost => "Resource is marked as lost",
        }
    }

    /// Whether a new loan may start from this status
    #[must_use]
    pub fn is_lendable(self) -> bool {
        self == Self::Available
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "AVAILABLE",
            Self::Borrowed => "BORROWED",
            Self::Reserved => "RESERVED",
            Self::Lost => "LOST",
        };
        f.write_str(label)
    }
}
