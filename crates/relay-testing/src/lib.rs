//! # Relay Testing
//!
//! A simulated host application for exercising the relay without a real
//! chat frontend.
//!
//! [`MockHost`] implements every host trait. A profile command is accepted
//! immediately and then plays out on a background task the way a real host
//! reconnects: the connection indicator drops, the profile-loaded event
//! fires, and the indicator comes back. [`MockBehavior`] scripts the
//! failure modes (lost event, refused command, reconnect that never
//! happens), and every command and continue call is recorded for
//! assertions.

pub mod mock_host;

pub use mock_host::{MockBehavior, MockHost};
