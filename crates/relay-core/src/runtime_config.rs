//! # Environment-Based Runtime Configuration
//!
//! Timeouts and delays of the swap protocol and the cycle controller.
//!
//! ## Environment Variables
//!
//! - `RELAY_PROFILE_LOADED_TIMEOUT_MS` - Wait for the profile-loaded event (default: 5000)
//! - `RELAY_STATUS_TIMEOUT_MS` - Wait for each connection status edge (default: 5000)
//! - `RELAY_STATUS_POLL_INTERVAL_MS` - Poll interval of the status observer (default: 100)
//! - `RELAY_SETTLE_DELAY_MS` - Delay after generation-ended before re-evaluating (default: 200)
//! - `RELAY_CONTINUE_SETTLE_MS` - Delay after priming an auto-continue (default: 200)
//! - `RELAY_SETTINGS_DEBOUNCE_MS` - Debounce window of settings persistence (default: 500)
//! - `RELAY_STATUS_OBSERVER` - `poll` or `watch` (default: poll)

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::{env, time::Duration};

use crate::error::ConfigError;

/// How connection status edges are observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusObserverKind {
    /// Poll the host's readable status value
    #[default]
    Poll,
    /// Follow a pushed status channel
    Watch,
}

impl FromStr for StatusObserverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "poll" => Ok(StatusObserverKind::Poll),
            "watch" | "event" => Ok(StatusObserverKind::Watch),
            other => Err(format!("expected 'poll' or 'watch', got '{other}'")),
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRuntimeConfig {
    pub profile_loaded_timeout: Duration,
    pub status_timeout: Duration,
    pub status_poll_interval: Duration,
    pub settle_delay: Duration,
    pub continue_settle_delay: Duration,
    pub settings_debounce: Duration,
    pub status_observer: StatusObserverKind,
}

impl Default for RelayRuntimeConfig {
    fn default() -> Self {
        Self {
            profile_loaded_timeout: Duration::from_millis(5000),
            status_timeout: Duration::from_millis(5000),
            status_poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_millis(200),
            continue_settle_delay: Duration::from_millis(200),
            settings_debounce: Duration::from_millis(500),
            status_observer: StatusObserverKind::Poll,
        }
    }
}

/// Builder for [`RelayRuntimeConfig`] with environment variable support
#[derive(Debug, Clone, Default)]
pub struct RelayRuntimeConfigBuilder {
    config: RelayRuntimeConfig,
}

impl RelayRuntimeConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable holds an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::default();

        if let Some(ms) = get_env_u64("RELAY_PROFILE_LOADED_TIMEOUT_MS")? {
            builder = builder.profile_loaded_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = get_env_u64("RELAY_STATUS_TIMEOUT_MS")? {
            builder = builder.status_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = get_env_u64("RELAY_STATUS_POLL_INTERVAL_MS")? {
            builder = builder.status_poll_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = get_env_u64("RELAY_SETTLE_DELAY_MS")? {
            builder = builder.settle_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = get_env_u64("RELAY_CONTINUE_SETTLE_MS")? {
            builder = builder.continue_settle_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = get_env_u64("RELAY_SETTINGS_DEBOUNCE_MS")? {
            builder = builder.settings_debounce(Duration::from_millis(ms));
        }
        if let Ok(kind) = env::var("RELAY_STATUS_OBSERVER") {
            let kind = kind
                .parse::<StatusObserverKind>()
                .map_err(|message| ConfigError::InvalidEnvVar {
                    key: "RELAY_STATUS_OBSERVER".to_string(),
                    message,
                })?;
            builder = builder.status_observer(kind);
        }

        Ok(builder)
    }

    #[must_use]
    pub fn profile_loaded_timeout(mut self, timeout: Duration) -> Self {
        self.config.profile_loaded_timeout = timeout;
        self
    }

    #[must_use]
    pub fn status_timeout(mut self, timeout: Duration) -> Self {
        self.config.status_timeout = timeout;
        self
    }

    #[must_use]
    pub fn status_poll_interval(mut self, interval: Duration) -> Self {
        self.config.status_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn continue_settle_delay(mut self, delay: Duration) -> Self {
        self.config.continue_settle_delay = delay;
        self
    }

    #[must_use]
    pub fn settings_debounce(mut self, window: Duration) -> Self {
        self.config.settings_debounce = window;
        self
    }

    #[must_use]
    pub fn status_observer(mut self, kind: StatusObserverKind) -> Self {
        self.config.status_observer = kind;
        self
    }

    /// Validate configuration and build [`RelayRuntimeConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<RelayRuntimeConfig, ConfigError> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        let non_zero = [
            ("profile_loaded_timeout", c.profile_loaded_timeout),
            ("status_timeout", c.status_timeout),
            ("status_poll_interval", c.status_poll_interval),
            // Re-entering immediately after generation-ended races the host's chat pipeline.
            ("settle_delay", c.settle_delay),
            ("continue_settle_delay", c.continue_settle_delay),
            ("settings_debounce", c.settings_debounce),
        ];
        for (name, value) in non_zero {
            if value.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if c.status_poll_interval >= c.status_timeout {
            return Err(ConfigError::ValidationError(
                "status_poll_interval must be shorter than status_timeout".to_string(),
            ));
        }

        Ok(())
    }
}

fn get_env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}
