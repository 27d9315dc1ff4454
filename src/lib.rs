//! # Reasoning Relay
//!
//! Runs each chat generation on a dedicated "reasoning" connection profile
//! and hands the conversation back to the user's regular "response" profile
//! afterwards, optionally continuing the generation on the response profile
//! so it can write the final answer.
//!
//! ## Core Components
//!
//! - **[core]**: data model, host traits and runtime configuration
//! - **[events]**: event bus, bounded event waits and connection status observers
//! - **[cycle]**: confirmed profile swaps and the generation cycle state machine
//!
//! ## Quick Start
//!
//! ```rust
//! use reasoning_relay::{ExtensionConfig, HostBindings, Relay, SETTINGS_NAMESPACE, SettingsStore};
//! use reasoning_relay::events::EventBus;
//! use relay_testing::MockHost;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new();
//! let host = Arc::new(MockHost::new(bus.clone(), "Writer", &["Writer", "Thinker"]));
//! host.store(SETTINGS_NAMESPACE, ExtensionConfig {
//!     reasoning_profile_id: "thinker".into(),
//!     reasoning_profile_name: "Thinker".into(),
//!     is_extension_active: true,
//!     ..ExtensionConfig::default()
//! }.to_value());
//!
//! let relay = Relay::builder(HostBindings::from_host(host.clone()), bus)
//!     .build()
//!     .unwrap();
//! let controller = relay.controller();
//! controller.on_app_ready().await;
//!
//! controller.on_generation_started().await;
//! assert_eq!(host.active_profile_name().as_deref(), Some("Thinker"));
//!
//! controller.on_generation_ended().await;
//! assert_eq!(host.active_profile_name().as_deref(), Some("Writer"));
//! # }
//! ```

pub use relay_core as core;
pub use relay_cycle as cycle;
pub use relay_events as events;

pub use relay_core::{
    ConnectionState, CycleState, ExtensionConfig, HostBindings, HostEvent, ProfileRef,
    RelayRuntimeConfig, RelayRuntimeConfigBuilder, SETTINGS_NAMESPACE, SettingsStore,
    SwapDirection, SwapPhase, TriggerKind,
};
pub use relay_cycle::{
    CommandReply, EndOutcome, GenerationCycleController, OperatorCommand, ProfileSwitcher, Relay,
    RelayHandle, SettingsManager, StartOutcome, SwapError, SwapOutcome,
};
