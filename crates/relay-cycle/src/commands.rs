//! Operator commands the host exposes as slash commands

use crate::error::SwapError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Manual overrides available regardless of the master switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorCommand {
    SwapToReasoning,
    SwapToResponse,
    ToggleActive,
}

impl OperatorCommand {
    pub const ALL: [OperatorCommand; 3] = [
        OperatorCommand::SwapToReasoning,
        OperatorCommand::SwapToResponse,
        OperatorCommand::ToggleActive,
    ];

    /// Registered command name, without the leading slash
    pub fn name(self) -> &'static str {
        match self {
            OperatorCommand::SwapToReasoning => "relay-swap-reasoning",
            OperatorCommand::SwapToResponse => "relay-swap-response",
            OperatorCommand::ToggleActive => "relay-toggle",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            OperatorCommand::SwapToReasoning => "Switch to the configured reasoning profile",
            OperatorCommand::SwapToResponse => "Switch back to the response profile",
            OperatorCommand::ToggleActive => "Turn automatic profile swapping on or off",
        }
    }
}

impl fmt::Display for OperatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown relay command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for OperatorCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('/');
        Self::ALL
            .into_iter()
            .find(|command| command.name() == name)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// What the host shows after running a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    Ok,
    /// Command ran; reports the new master switch value
    Toggled { active: bool },
    Failed(SwapError),
}

impl CommandReply {
    pub fn is_ok(&self) -> bool {
        !matches!(self, CommandReply::Failed(_))
    }
}

impl fmt::Display for CommandReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandReply::Ok => f.write_str("ok"),
            CommandReply::Toggled { active: true } => f.write_str("ok (active)"),
            CommandReply::Toggled { active: false } => f.write_str("ok (inactive)"),
            CommandReply::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}
