//! Named host events the relay listens to

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle events emitted by the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEvent {
    /// A generation request has started
    GenerationStarted,
    /// A generation request has finished (successfully or not)
    GenerationEnded,
    /// The user's message has been rendered into the chat
    UserMessageRendered,
    /// The host finished loading a connection profile
    ProfileLoaded,
    /// The host finished its own start-up
    AppReady,
    /// The reasoning block of a streamed reply is complete
    ReasoningStreamDone,
}

impl HostEvent {
    pub const ALL: [HostEvent; 6] = [
        HostEvent::GenerationStarted,
        HostEvent::GenerationEnded,
        HostEvent::UserMessageRendered,
        HostEvent::ProfileLoaded,
        HostEvent::AppReady,
        HostEvent::ReasoningStreamDone,
    ];

    /// Stable wire name
    pub fn as_str(self) -> &'static str {
        match self {
            HostEvent::GenerationStarted => "generation_started",
            HostEvent::GenerationEnded => "generation_ended",
            HostEvent::UserMessageRendered => "user_message_rendered",
            HostEvent::ProfileLoaded => "profile_loaded",
            HostEvent::AppReady => "app_ready",
            HostEvent::ReasoningStreamDone => "reasoning_stream_done",
        }
    }
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an event name the relay does not know
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown host event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for HostEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HostEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Which host event starts a generation cycle
///
/// Exactly one trigger is wired at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    #[default]
    GenerationStarted,
    UserMessageRendered,
}

impl TriggerKind {
    /// Trigger implied by the only-trigger-when-user-last setting
    pub fn for_user_last_only(only_when_user_last: bool) -> Self {
        if only_when_user_last {
            TriggerKind::UserMessageRendered
        } else {
            TriggerKind::GenerationStarted
        }
    }

    pub fn event(self) -> HostEvent {
        match self {
            TriggerKind::GenerationStarted => HostEvent::GenerationStarted,
            TriggerKind::UserMessageRendered => HostEvent::UserMessageRendered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_parse_back() {
        for event in HostEvent::ALL {
            assert_eq!(event.as_str().parse::<HostEvent>(), Ok(event));
        }
        assert!("generation_paused".parse::<HostEvent>().is_err());
    }

    #[test]
    fn test_trigger_kind_follows_user_last_flag() {
        assert_eq!(
            TriggerKind::for_user_last_only(true).event(),
            HostEvent::UserMessageRendered
        );
        assert_eq!(
            TriggerKind::for_user_last_only(false).event(),
            HostEvent::GenerationStarted
        );
    }
}
