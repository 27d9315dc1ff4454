//! # Relay Core
//!
//! Shared vocabulary for the reasoning profile relay: the data model of a
//! generation cycle, the narrow traits through which the host application is
//! reached, and the error and configuration types used across the workspace.
//!
//! ## Components
//!
//! - **[`ProfileRef`]**: identifier + display name of a connection profile
//! - **[`ExtensionConfig`]**: persisted user configuration with defaulting rules
//! - **[`CycleState`]**: transient swap/cycle state machine value
//! - **[`HostBindings`]**: handles to every host capability the relay consumes
//! - **[`RelayRuntimeConfig`]**: timeouts and delays, loadable from the environment

pub mod error;
pub mod event;
pub mod extension_config;
pub mod host;
pub mod profile;
pub mod runtime_config;
pub mod state;

pub use error::{ConfigError, HostError, HostResult};
pub use event::{HostEvent, TriggerKind, UnknownEvent};
pub use extension_config::{ExtensionConfig, LoadedConfig, SETTINGS_NAMESPACE};
pub use host::{
    ChatMessage, ChatStore, ConnectionState, ConnectionStatusSource, GenerationControl,
    HostBindings, ProfileCommand, SettingsStore,
};
pub use profile::{NO_PROFILE, ProfileRef, is_unset};
pub use runtime_config::{RelayRuntimeConfig, RelayRuntimeConfigBuilder, StatusObserverKind};
pub use state::{CycleState, SwapDirection, SwapPhase};
