//! Outcome of a best-effort pipeline step

use std::fmt;
use tracing::{error, info};

/// Result of a step that reports failure instead of aborting the run
///
/// Schema setup and provisioning are allowed to fail without stopping later
/// stages; callers inspect the outcome rather than catching an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed { message: String },
}

impl StepOutcome {
    /// Convert a step result into an outcome, logging failures at error level
    pub fn from_result<T>(step: &str, result: crate::Result<T>) -> Self {
        match result {
            Ok(_) => {
                info!(step, "Step completed");
                StepOutcome::Succeeded
            }
            Err(e) => {
                error!(step, error = %e, "Step failed, continuing");
                StepOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Like [`StepOutcome::from_result`], keeping the value of a successful step
    pub fn capture<T>(step: &str, result: crate::Result<T>) -> (Option<T>, Self) {
        match result {
            Ok(value) => (Some(value), Self::from_result(step, Ok::<(), crate::Error>(()))),
            Err(e) => (None, Self::from_result::<T>(step, Err(e))),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Succeeded => write!(f, "succeeded"),
            StepOutcome::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}
