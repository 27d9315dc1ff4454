//! # Relay Events
//!
//! Waiting primitives over the host application's signals.
//!
//! ## Features
//!
//! - **Event bus**: named host events with persistent and one-shot listeners
//! - **EventWaiter**: arm a one-shot wait with a deadline before triggering the
//!   action that should cause the event
//! - **Bounded polling**: explicit poll loop with interval and overall timeout
//! - **Connection status**: poll-driven or event-driven observers of the
//!   host's connected/disconnected indicator
//!
//! ## Example
//!
//! ```rust
//! use relay_core::HostEvent;
//! use relay_events::{EventBus, EventWaiter};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new();
//! let waiter = EventWaiter::new(bus.clone());
//!
//! let pending = waiter.arm(HostEvent::ProfileLoaded, Duration::from_secs(5));
//! bus.emit(HostEvent::ProfileLoaded, serde_json::json!({ "profile": "Reasoner" }));
//!
//! let payload = pending.wait().await.unwrap();
//! assert_eq!(payload.data["profile"], "Reasoner");
//! assert_eq!(bus.listener_count(HostEvent::ProfileLoaded), 0);
//! # }
//! ```

pub mod bus;
pub mod error;
pub mod status;
pub mod waiter;

pub use bus::{EventBus, EventPayload, ListenerId, Subscription};
pub use error::{WaitError, WaitResult};
pub use status::{
    ConnectionStatusObserver, PollingStatusObserver, WatchStatusObserver, wait_until,
};
pub use waiter::{EventWaiter, PendingEvent};
