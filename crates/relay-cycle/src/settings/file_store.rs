use crate::error::{SettingsError, SettingsResult};
use dashmap::DashMap;
use relay_core::SettingsStore;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;

/// Settings store backed by a single JSON file.
///
/// Each namespace is one top-level key of the file. `save_debounced`
/// coalesces bursts of changes into one write after the debounce window;
/// writes go through a temporary file and a rename so a crash never leaves
/// a half-written file behind.
///
/// Outside a tokio runtime the save happens immediately.
#[derive(Clone)]
pub struct JsonFileSettingsStore {
    inner: Arc<FileStoreInner>,
}

struct FileStoreInner {
    path: PathBuf,
    entries: DashMap<String, Value>,
    debounce: Duration,
    save_scheduled: AtomicBool,
}

impl JsonFileSettingsStore {
    /// Open `path`, loading existing contents when present
    pub fn open(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let path = path.into();
        let entries = DashMap::new();
        if let Some(existing) = Self::read_file(&path) {
            for (namespace, value) in existing {
                entries.insert(namespace, value);
            }
        }
        Self {
            inner: Arc::new(FileStoreInner {
                path,
                entries,
                debounce,
                save_scheduled: AtomicBool::new(false),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Write pending changes now
    pub fn flush(&self) -> SettingsResult<()> {
        self.inner.save_scheduled.store(false, Ordering::SeqCst);
        self.inner.persist()
    }

    /// Copy an unreadable settings file aside; returns the backup path
    fn backup_corrupted(path: &Path) -> Option<PathBuf> {
        let parent = path.parent()?;
        let backup = parent.join(format!(
            "{}.corrupted.{}",
            path.file_name().unwrap_or_default().to_string_lossy(),
            chrono::Utc::now().timestamp()
        ));
        match fs::copy(path, &backup) {
            Ok(_) => {
                tracing::warn!(path = ?path, backup = ?backup, "Backed up corrupted settings file");
                Some(backup)
            }
            Err(e) => {
                tracing::warn!(
                    path = ?path,
                    backup = ?backup,
                    error = %e,
                    "Failed to back up corrupted settings file"
                );
                None
            }
        }
    }

    fn read_file(path: &Path) -> Option<Map<String, Value>> {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(entries) => {
                    tracing::debug!(path = ?path, namespaces = entries.len(), "Loaded settings file");
                    Some(entries)
                }
                Err(e) => {
                    tracing::error!(
                        path = ?path,
                        error = %e,
                        "Failed to parse settings file, starting fresh"
                    );
                    Self::backup_corrupted(path);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = ?path, "Settings file not found, starting fresh");
                None
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read settings file");
                None
            }
        }
    }
}

impl FileStoreInner {
    fn persist(&self) -> SettingsResult<()> {
        let snapshot: Map<String, Value> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot)?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json).map_err(|source| SettingsError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| SettingsError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        tracing::debug!(path = ?self.path, namespaces = snapshot.len(), "Persisted settings");
        Ok(())
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self, namespace: &str) -> Option<Value> {
        self.inner
            .entries
            .get(namespace)
            .map(|entry| entry.value().clone())
    }

    fn store(&self, namespace: &str, value: Value) {
        self.inner.entries.insert(namespace.to_string(), value);
    }

    fn save_debounced(&self) {
        if self.inner.save_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            self.inner.save_scheduled.store(false, Ordering::SeqCst);
            if let Err(e) = self.inner.persist() {
                tracing::error!(error = %e, "Failed to save settings");
            }
            return;
        };

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            if !inner.save_scheduled.swap(false, Ordering::SeqCst) {
                // flushed in the meantime
                return;
            }
            if let Err(e) = inner.persist() {
                tracing::error!(path = ?inner.path, error = %e, "Failed to save settings");
            }
        });
    }
}

impl std::fmt::Debug for JsonFileSettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileSettingsStore")
            .field("path", &self.inner.path)
            .field("debounce", &self.inner.debounce)
            .field("namespaces", &self.inner.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_save_outside_runtime_writes_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonFileSettingsStore::open(&path, Duration::from_millis(500));

        store.store("reasoningRelay", json!({ "isExtensionActive": true }));
        store.save_debounced();

        let reopened = JsonFileSettingsStore::open(&path, Duration::from_millis(500));
        assert_eq!(
            reopened.load("reasoningRelay"),
            Some(json!({ "isExtensionActive": true }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_saves_coalesce() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonFileSettingsStore::open(&path, Duration::from_millis(500));

        store.store("reasoningRelay", json!({ "autoContinueAfterReasoning": false }));
        store.save_debounced();
        store.store("reasoningRelay", json!({ "autoContinueAfterReasoning": true }));
        store.save_debounced();
        assert!(!path.exists());

        tokio::time::sleep(Duration::from_millis(600)).await;

        let contents: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(contents["reasoningRelay"]["autoContinueAfterReasoning"], true);
    }

    #[test]
    fn test_flush_persists_without_waiting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonFileSettingsStore::open(&path, Duration::from_secs(60));

        store.store("other", json!(1));
        store.flush().unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupted_file_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileSettingsStore::open(&path, Duration::from_millis(500));
        assert_eq!(store.load("reasoningRelay"), None);

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(".corrupted."))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_backup_of_missing_file_reports_failure() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone.json");

        assert_eq!(JsonFileSettingsStore::backup_corrupted(&missing), None);

        let present = dir.path().join("settings.json");
        fs::write(&present, "{ not json").unwrap();
        let backup = JsonFileSettingsStore::backup_corrupted(&present).unwrap();
        assert_eq!(fs::read_to_string(backup).unwrap(), "{ not json");
    }
}
