use dashmap::DashMap;
use relay_core::SettingsStore;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-local settings store; saves are counted, not persisted
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    entries: DashMap<String, Value>,
    save_requests: AtomicUsize,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_debounced` calls so far
    pub fn save_requests(&self) -> usize {
        self.save_requests.load(Ordering::SeqCst)
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load(&self, namespace: &str) -> Option<Value> {
        self.entries.get(namespace).map(|entry| entry.value().clone())
    }

    fn store(&self, namespace: &str, value: Value) {
        self.entries.insert(namespace.to_string(), value);
    }

    fn save_debounced(&self) {
        self.save_requests.fetch_add(1, Ordering::SeqCst);
    }
}
