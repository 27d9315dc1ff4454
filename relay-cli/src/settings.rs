use crate::error::{CliError, CliResult};
use clap::Subcommand;
use relay_core::{ProfileRef, RelayRuntimeConfigBuilder};
use relay_cycle::{JsonFileSettingsStore, SettingsManager};
use std::path::Path;
use std::sync::Arc;

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the stored settings (defaults applied)
    Show,
    /// Choose the reasoning profile; "None" clears it
    SetProfile {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: Option<String>,
    },
    SetAutoContinue {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    SetUserLastOnly {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    SetActive {
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
    /// Flip the master switch
    Toggle,
    /// Text written into the last message before auto-continue
    SetPrefix { prefix: String },
}

pub fn run_settings_command(path: &Path, action: SettingsAction) -> CliResult<()> {
    let runtime = RelayRuntimeConfigBuilder::from_env()?.build()?;
    let store = Arc::new(JsonFileSettingsStore::open(path, runtime.settings_debounce));
    let manager = SettingsManager::load(store.clone());

    let config = match action {
        SettingsAction::Show => manager.snapshot(),
        SettingsAction::SetProfile { id, name } => {
            let name = match name {
                Some(name) => name,
                None if relay_core::is_unset(&id) => relay_core::NO_PROFILE.to_string(),
                None => {
                    return Err(CliError::Usage(format!(
                        "--name is required when selecting profile '{id}'"
                    )));
                }
            };
            manager.set_reasoning_profile(&ProfileRef::new(id, name))
        }
        SettingsAction::SetAutoContinue { enabled } => manager.set_auto_continue(enabled),
        SettingsAction::SetUserLastOnly { enabled } => {
            manager.set_only_trigger_when_user_last(enabled)
        }
        SettingsAction::SetActive { active } => manager.set_active(active),
        SettingsAction::Toggle => {
            manager.toggle_active();
            manager.snapshot()
        }
        SettingsAction::SetPrefix { prefix } => manager.set_post_reasoning_prefix(prefix),
    };

    store.flush()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{SETTINGS_NAMESPACE, SettingsStore};
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_set_profile_persists_both_halves() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        run_settings_command(
            &path,
            SettingsAction::SetProfile {
                id: "thinker".into(),
                name: Some("Thinker".into()),
            },
        )
        .unwrap();

        let store = JsonFileSettingsStore::open(&path, Duration::from_millis(500));
        let stored = store.load(SETTINGS_NAMESPACE).unwrap();
        assert_eq!(stored["reasoningProfileId"], "thinker");
        assert_eq!(stored["reasoningProfileName"], "Thinker");
    }

    #[test]
    fn test_set_profile_without_name_rejected() {
        let dir = tempdir().unwrap();
        let result = run_settings_command(
            &dir.path().join("settings.json"),
            SettingsAction::SetProfile {
                id: "thinker".into(),
                name: None,
            },
        );
        assert!(matches!(result, Err(CliError::Usage(_))));
    }
}
