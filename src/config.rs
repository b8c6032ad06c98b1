//! Lending policy configuration.

use std::{fs, path::Path};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{LendingError, Result};

/// Default loan length in days
pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;

/// Default number of transitions kept in the history log
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// What to do with holders who keep a resource past its due date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverduePolicy {
    /// Overdue loans have no effect on new borrows
    #[default]
    Ignore,
    /// A holder with any overdue loan cannot borrow anything else
    BlockHolder,
}

/// Tunables for the lending service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LendingConfig {
    /// Length of a loan in days
    pub loan_period_days: u32,
    /// Maximum number of transitions kept in memory
    pub history_limit: usize,
    /// Overdue handling
    pub overdue_policy: OverduePolicy,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            overdue_policy: OverduePolicy::Ignore,
        }
    }
}

impl LendingConfig {
    /// Parse and validate a configuration from JSON
    ///
    /// # Errors
    ///
    /// Returns `LendingError::Config` if the JSON is malformed or the
    /// loan period is zero
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LendingError::Config(format!("Failed to parse JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns `LendingError::Config` if the file cannot be read or its
    /// contents are invalid
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            LendingError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    /// Check invariants that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `LendingError::Config` if the loan period is zero
    pub fn validate(&self) -> Result<()> {
        if self.loan_period_days == 0 {
            return Err(LendingError::Config("loan_period_days must be positive".to_string()));
        }
        Ok(())
    }

    /// Loan length as a duration
    #[must_use]
    pub fn loan_period(&self) -> Duration {
        Duration::days(i64::from(self.loan_period_days))
    }
}
