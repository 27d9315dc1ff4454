//! Error types for bounded waits

use relay_core::HostEvent;
use std::time::Duration;
use thiserror::Error;

/// Result type for wait operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Errors that can occur while waiting on a host signal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The named event did not fire before the deadline
    #[error("Timed out after {after:?} waiting for event '{event}'")]
    Timeout { event: HostEvent, after: Duration },

    /// A polled or watched condition did not hold before the deadline
    #[error("Timed out after {after:?} waiting for {what}")]
    ConditionTimeout { what: String, after: Duration },

    /// The listener was removed from the bus before the event fired
    #[error("Listener for '{0}' was detached before the event fired")]
    Detached(HostEvent),

    /// The signal source went away
    #[error("Signal source closed: {0}")]
    SourceClosed(String),
}

impl WaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WaitError::Timeout { .. } | WaitError::ConditionTimeout { .. }
        )
    }
}
