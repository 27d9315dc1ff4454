//! Error types for profile swaps and settings

use relay_core::{HostError, SwapPhase};
use relay_events::WaitError;
use std::fmt;
use thiserror::Error;

/// Result type for profile swaps
pub type SwapResult<T> = Result<T, SwapError>;

/// Which confirmation gate of the swap protocol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapStage {
    /// Connection indicator leaving the connected state
    Disconnect,
    /// Host's profile-loaded event
    ProfileLoaded,
    /// Connection indicator returning to connected
    Reconnect,
}

impl fmt::Display for SwapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapStage::Disconnect => f.write_str("disconnect"),
            SwapStage::ProfileLoaded => f.write_str("profile_loaded"),
            SwapStage::Reconnect => f.write_str("reconnect"),
        }
    }
}

/// Errors that can occur during a profile swap
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    /// No reasoning target configured
    #[error("No reasoning profile selected")]
    NoProfileSelected,

    /// The host reports no live profile and none is known to return to
    #[error("No response profile to return to after reasoning")]
    NoResponseProfile,

    /// One of the three bounded waits exceeded its deadline
    #[error("Profile swap not confirmed at {stage} stage: {source}")]
    SwapTimeout {
        stage: SwapStage,
        #[source]
        source: WaitError,
    },

    /// The host refused the profile-change command
    #[error("Host rejected switch to '{profile}': {source}")]
    HostCommandRejected {
        profile: String,
        #[source]
        source: HostError,
    },

    /// Another swap holds the latch
    #[error("Profile swap already in flight ({in_flight:?})")]
    SwapInProgress { in_flight: SwapPhase },
}

impl SwapError {
    /// Timeouts and rejections are both "could not confirm swap"
    pub fn is_unconfirmed(&self) -> bool {
        matches!(
            self,
            SwapError::SwapTimeout { .. } | SwapError::HostCommandRejected { .. }
        )
    }

    pub fn stage(&self) -> Option<SwapStage> {
        match self {
            SwapError::SwapTimeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for settings persistence
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors raised by settings stores and the settings manager
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Unknown profile id: {0}")]
    UnknownProfile(String),

    #[error("Settings serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
