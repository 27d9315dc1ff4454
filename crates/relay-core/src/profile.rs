//! Connection profile references

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value the host selector uses when no profile is chosen
pub const NO_PROFILE: &str = "None";

/// Returns true when a profile id or name does not designate a real profile
pub fn is_unset(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == NO_PROFILE
}

/// A named backend configuration the host can switch to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileRef {
    pub id: String,
    pub name: String,
}

impl ProfileRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The selector's "nothing selected" entry
    pub fn none() -> Self {
        Self::new(NO_PROFILE, NO_PROFILE)
    }

    /// Either half being unset means no usable profile was chosen.
    pub fn is_none(&self) -> bool {
        is_unset(&self.id) || is_unset(&self.name)
    }
}

impl Default for ProfileRef {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for ProfileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
