//! # Relay Cycle
//!
//! The reasoning/response hand-off itself.
//!
//! - [`ProfileSwitcher`] performs one confirmed profile swap: command, then
//!   disconnect, profile-loaded event and reconnect, each bounded by a timeout.
//! - [`GenerationCycleController`] swaps to the reasoning profile when a
//!   generation starts, back when it ends, and optionally auto-continues on the
//!   response profile.
//! - [`CycleDriver`] feeds host events from the bus into the controller, one at
//!   a time.
//! - [`SettingsManager`] owns the persisted settings and their setters.
//!
//! [`Relay`] wires all of it from a set of [`relay_core::HostBindings`].

pub mod commands;
pub mod controller;
pub mod driver;
pub mod error;
pub mod relay;
pub mod settings;
pub mod switcher;

pub use commands::{CommandReply, OperatorCommand, UnknownCommand};
pub use controller::{EndOutcome, GenerationCycleController, StartOutcome};
pub use driver::CycleDriver;
pub use error::{SettingsError, SettingsResult, SwapError, SwapResult, SwapStage};
pub use relay::{Relay, RelayBuilder, RelayHandle};
pub use settings::{InMemorySettingsStore, JsonFileSettingsStore, SettingsManager};
pub use switcher::{ProfileSwitcher, SwapOutcome};
