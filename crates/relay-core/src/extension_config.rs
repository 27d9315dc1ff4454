//! # Extension Configuration
//!
//! User-facing settings persisted in the host's settings store under
//! [`SETTINGS_NAMESPACE`]. Loading is forgiving: a missing namespace, a value
//! that is not an object, or any missing/null field is repaired with the
//! field's default, and the repaired keys are reported so callers can log
//! them and write the repaired object back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::TriggerKind;
use crate::profile::{NO_PROFILE, ProfileRef, is_unset};

/// Key of the relay's object inside the host settings store
pub const SETTINGS_NAMESPACE: &str = "reasoningRelay";

const DEFAULT_POST_REASONING_PREFIX: &str = "\n ";

/// Persisted relay settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionConfig {
    pub reasoning_profile_id: String,
    pub reasoning_profile_name: String,
    pub auto_continue_after_reasoning: bool,
    pub only_trigger_when_user_last: bool,
    pub is_extension_active: bool,
    /// Text the last message is primed with before an auto-continue
    pub post_reasoning_prefix: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            reasoning_profile_id: NO_PROFILE.to_string(),
            reasoning_profile_name: NO_PROFILE.to_string(),
            auto_continue_after_reasoning: false,
            only_trigger_when_user_last: false,
            is_extension_active: false,
            post_reasoning_prefix: DEFAULT_POST_REASONING_PREFIX.to_string(),
        }
    }
}

/// Result of reading the stored settings object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: ExtensionConfig,
    /// Keys that were missing, null or malformed and got their default
    pub repaired_fields: Vec<&'static str>,
}

impl LoadedConfig {
    pub fn needs_write_back(&self) -> bool {
        !self.repaired_fields.is_empty()
    }
}

impl ExtensionConfig {
    /// Build the config from whatever the settings store holds
    pub fn from_stored(stored: Option<&Value>) -> LoadedConfig {
        let defaults = Self::default();
        let empty = Map::new();
        let object = stored.and_then(Value::as_object).unwrap_or(&empty);
        let mut repaired = Vec::new();

        let mut read_profile = |key: &'static str, fallback: &str| -> String {
            match object.get(key).and_then(Value::as_str) {
                Some(value) if !value.trim().is_empty() => value.to_string(),
                _ => {
                    repaired.push(key);
                    fallback.to_string()
                }
            }
        };
        let reasoning_profile_id = read_profile("reasoningProfileId", &defaults.reasoning_profile_id);
        let reasoning_profile_name =
            read_profile("reasoningProfileName", &defaults.reasoning_profile_name);

        let mut read_flag = |key: &'static str, fallback: bool| -> bool {
            match object.get(key).and_then(Value::as_bool) {
                Some(value) => value,
                None => {
                    repaired.push(key);
                    fallback
                }
            }
        };
        let auto_continue_after_reasoning = read_flag(
            "autoContinueAfterReasoning",
            defaults.auto_continue_after_reasoning,
        );
        let only_trigger_when_user_last = read_flag(
            "onlyTriggerWhenUserLast",
            defaults.only_trigger_when_user_last,
        );
        let is_extension_active = read_flag("isExtensionActive", defaults.is_extension_active);

        // An explicitly empty prefix is a valid choice.
        let post_reasoning_prefix = match object.get("postReasoningPrefix").and_then(Value::as_str)
        {
            Some(value) => value.to_string(),
            None => {
                repaired.push("postReasoningPrefix");
                defaults.post_reasoning_prefix.clone()
            }
        };

        LoadedConfig {
            config: Self {
                reasoning_profile_id,
                reasoning_profile_name,
                auto_continue_after_reasoning,
                only_trigger_when_user_last,
                is_extension_active,
                post_reasoning_prefix,
            },
            repaired_fields: repaired,
        }
    }

    /// JSON object as written to the settings store
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Configured reasoning target, `None` when nothing usable is selected
    pub fn reasoning_profile(&self) -> Option<ProfileRef> {
        if is_unset(&self.reasoning_profile_id) || is_unset(&self.reasoning_profile_name) {
            return None;
        }
        Some(ProfileRef::new(
            self.reasoning_profile_id.clone(),
            self.reasoning_profile_name.clone(),
        ))
    }

    pub fn trigger_kind(&self) -> TriggerKind {
        TriggerKind::for_user_last_only(self.only_trigger_when_user_last)
    }
}
