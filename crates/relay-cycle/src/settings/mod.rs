//! # Settings
//!
//! [`SettingsManager`] owns the live [`ExtensionConfig`]. It loads and
//! repairs the stored object once at startup, then every designated setter
//! updates the snapshot, writes it back under the relay's namespace and asks
//! the store for a debounced save. Subscribers see changes through a watch
//! channel, which is how the cycle driver notices a trigger change.

mod file_store;
mod in_memory;

pub use file_store::JsonFileSettingsStore;
pub use in_memory::InMemorySettingsStore;

use crate::error::{SettingsError, SettingsResult};
use relay_core::{ExtensionConfig, ProfileRef, SETTINGS_NAMESPACE, SettingsStore};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct SettingsManager {
    store: Arc<dyn SettingsStore>,
    config: watch::Sender<ExtensionConfig>,
}

impl SettingsManager {
    /// Load settings from `store`, repairing and writing back bad fields
    pub fn load(store: Arc<dyn SettingsStore>) -> Self {
        let loaded = ExtensionConfig::from_stored(store.load(SETTINGS_NAMESPACE).as_ref());
        if loaded.needs_write_back() {
            warn!(
                repaired = ?loaded.repaired_fields,
                "Stored settings incomplete, defaults applied"
            );
            store.store(SETTINGS_NAMESPACE, loaded.config.to_value());
            store.save_debounced();
        }
        info!(
            active = loaded.config.is_extension_active,
            reasoning_profile = %loaded.config.reasoning_profile_name,
            auto_continue = loaded.config.auto_continue_after_reasoning,
            user_last_only = loaded.config.only_trigger_when_user_last,
            "Settings loaded"
        );
        let (config, _) = watch::channel(loaded.config);
        Self { store, config }
    }

    /// Current settings
    pub fn snapshot(&self) -> ExtensionConfig {
        self.config.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.config.borrow().is_extension_active
    }

    /// Receive every settings change
    pub fn subscribe(&self) -> watch::Receiver<ExtensionConfig> {
        self.config.subscribe()
    }

    pub fn set_reasoning_profile(&self, profile: &ProfileRef) -> ExtensionConfig {
        self.update(|config| {
            config.reasoning_profile_id = profile.id.clone();
            config.reasoning_profile_name = profile.name.clone();
        })
    }

    /// Pick the reasoning profile by id from the host's list.
    ///
    /// The "None" id is always accepted and clears the selection.
    pub fn select_reasoning_profile(
        &self,
        id: &str,
        available: &[ProfileRef],
    ) -> SettingsResult<ExtensionConfig> {
        let profile = Self::selectable_profiles(available)
            .into_iter()
            .find(|profile| profile.id == id)
            .ok_or_else(|| SettingsError::UnknownProfile(id.to_string()))?;
        Ok(self.set_reasoning_profile(&profile))
    }

    pub fn set_auto_continue(&self, enabled: bool) -> ExtensionConfig {
        self.update(|config| config.auto_continue_after_reasoning = enabled)
    }

    pub fn set_only_trigger_when_user_last(&self, enabled: bool) -> ExtensionConfig {
        self.update(|config| config.only_trigger_when_user_last = enabled)
    }

    pub fn set_active(&self, active: bool) -> ExtensionConfig {
        self.update(|config| config.is_extension_active = active)
    }

    /// Flip the master switch, returning the new value
    pub fn toggle_active(&self) -> bool {
        self.update(|config| config.is_extension_active = !config.is_extension_active)
            .is_extension_active
    }

    pub fn set_post_reasoning_prefix(&self, prefix: impl Into<String>) -> ExtensionConfig {
        let prefix = prefix.into();
        self.update(|config| config.post_reasoning_prefix = prefix)
    }

    /// Profiles offered in a picker, with the explicit "None" entry first
    pub fn selectable_profiles(available: &[ProfileRef]) -> Vec<ProfileRef> {
        std::iter::once(ProfileRef::none())
            .chain(available.iter().filter(|profile| !profile.is_none()).cloned())
            .collect()
    }

    fn update<F>(&self, change: F) -> ExtensionConfig
    where
        F: FnOnce(&mut ExtensionConfig),
    {
        self.config.send_modify(change);
        let config = self.snapshot();
        self.store.store(SETTINGS_NAMESPACE, config.to_value());
        self.store.save_debounced();
        debug!(?config, "Settings updated");
        config
    }
}

impl std::fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsManager")
            .field("config", &*self.config.borrow())
            .finish()
    }
}
