//! Host collaborator traits
//!
//! The relay never talks to the host application directly. Every capability
//! it consumes is reached through one of these narrow traits, so a host
//! adapter (or a test double) only has to implement what is listed here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::HostResult;
use crate::profile::ProfileRef;

/// Binary liveness signal of the host's backend connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// A single chat entry as seen by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub is_from_user: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: true,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: false,
        }
    }
}

/// The host's profile-change command
#[async_trait]
pub trait ProfileCommand: Send + Sync {
    /// Ask the host to switch to the named profile.
    ///
    /// Returning `Ok` only means the request was accepted; the reconnect
    /// happens asynchronously and is confirmed through events and the
    /// connection status signal.
    async fn switch_profile(&self, name: &str) -> HostResult<()>;

    /// Name of the profile currently selected in the host
    fn active_profile(&self) -> Option<String>;

    /// All profiles the host knows about
    fn profiles(&self) -> Vec<ProfileRef>;
}

/// Readable connection indicator
pub trait ConnectionStatusSource: Send + Sync {
    fn status(&self) -> ConnectionState;
}

/// Ordered chat log with a mutable tail
#[async_trait]
pub trait ChatStore: Send + Sync {
    fn last_message(&self) -> Option<ChatMessage>;

    /// Overwrite the text of the last message in place
    fn set_last_message_text(&self, text: &str) -> HostResult<()>;

    async fn save_chat(&self) -> HostResult<()>;
}

/// Generation actions the relay may trigger
#[async_trait]
pub trait GenerationControl: Send + Sync {
    /// Equivalent of the user pressing "continue"
    async fn continue_generation(&self) -> HostResult<()>;
}

/// Host-owned settings store keyed by extension namespace
pub trait SettingsStore: Send + Sync {
    fn load(&self, namespace: &str) -> Option<serde_json::Value>;

    fn store(&self, namespace: &str, value: serde_json::Value);

    /// Schedule persistence; returns immediately.
    fn save_debounced(&self);
}

/// Handles to every host capability the relay consumes
#[derive(Clone)]
pub struct HostBindings {
    pub profiles: Arc<dyn ProfileCommand>,
    pub connection: Arc<dyn ConnectionStatusSource>,
    pub chat: Arc<dyn ChatStore>,
    pub generation: Arc<dyn GenerationControl>,
    pub settings: Arc<dyn SettingsStore>,
}

impl HostBindings {
    /// Bind all capabilities to a single host adapter
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: ProfileCommand
            + ConnectionStatusSource
            + ChatStore
            + GenerationControl
            + SettingsStore
            + 'static,
    {
        Self {
            profiles: host.clone(),
            connection: host.clone(),
            chat: host.clone(),
            generation: host.clone(),
            settings: host,
        }
    }

    /// Replace the settings store, keeping the other bindings
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }
}

impl fmt::Debug for HostBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBindings")
            .field("active_profile", &self.profiles.active_profile())
            .field("connection", &self.connection.status())
            .finish()
    }
}
