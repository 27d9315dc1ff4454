use async_trait::async_trait;
use relay_core::{
    ChatMessage, ChatStore, ConnectionState, ConnectionStatusSource, GenerationControl,
    HostError, HostEvent, HostResult, ProfileCommand, ProfileRef, SettingsStore,
};
use relay_events::EventBus;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// How the simulated host reacts to profile commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBehavior {
    /// Switch profiles but never emit the profile-loaded event
    pub drop_profile_loaded: bool,
    /// Refuse every profile command
    pub reject_commands: bool,
    /// Stay disconnected after loading the profile
    pub stall_reconnect: bool,
    /// Make the continue action fail
    pub fail_continue: bool,
    pub disconnect_after: Duration,
    pub load_after: Duration,
    pub reconnect_after: Duration,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            drop_profile_loaded: false,
            reject_commands: false,
            stall_reconnect: false,
            fail_continue: false,
            disconnect_after: Duration::from_millis(50),
            load_after: Duration::from_millis(150),
            reconnect_after: Duration::from_millis(250),
        }
    }
}

/// Simulated host application
#[derive(Clone)]
pub struct MockHost {
    bus: EventBus,
    profiles: Vec<ProfileRef>,
    active: Arc<Mutex<Option<String>>>,
    connection: Arc<watch::Sender<ConnectionState>>,
    chat: Arc<Mutex<Vec<ChatMessage>>>,
    settings: Arc<Mutex<HashMap<String, Value>>>,
    behavior: Arc<Mutex<MockBehavior>>,
    switch_history: Arc<Mutex<Vec<String>>>,
    continue_history: Arc<Mutex<Vec<String>>>,
    chat_saves: Arc<AtomicUsize>,
    settings_saves: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockHost {
    /// A connected host offering `profiles` by name, with `active` selected.
    ///
    /// Profile ids are the lowercased names.
    pub fn new(bus: EventBus, active: &str, profiles: &[&str]) -> Self {
        let (connection, _) = watch::channel(ConnectionState::Connected);
        Self {
            bus,
            profiles: profiles
                .iter()
                .map(|name| ProfileRef::new(name.to_lowercase(), *name))
                .collect(),
            active: Arc::new(Mutex::new(Some(active.to_string()))),
            connection: Arc::new(connection),
            chat: Arc::new(Mutex::new(Vec::new())),
            settings: Arc::new(Mutex::new(HashMap::new())),
            behavior: Arc::new(Mutex::new(MockBehavior::default())),
            switch_history: Arc::new(Mutex::new(Vec::new())),
            continue_history: Arc::new(Mutex::new(Vec::new())),
            chat_saves: Arc::new(AtomicUsize::new(0)),
            settings_saves: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Change the selected profile without any reconnect, like a user would
    pub fn set_active_profile(&self, name: &str) {
        *self.active.lock().unwrap() = Some(name.to_string());
    }

    /// Make the host unable to name its live profile
    pub fn clear_active_profile(&self) {
        *self.active.lock().unwrap() = None;
    }

    pub fn active_profile_name(&self) -> Option<String> {
        self.active.lock().unwrap().clone()
    }

    /// Change notifications for the connection indicator
    pub fn status_feed(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub fn push_message(&self, message: ChatMessage) {
        self.chat.lock().unwrap().push(message);
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.chat.lock().unwrap().clone()
    }

    /// Emit a host event with an empty payload
    pub fn emit(&self, event: HostEvent) -> usize {
        self.bus.emit(event, json!({}))
    }

    pub fn emit_with(&self, event: HostEvent, data: Value) -> usize {
        self.bus.emit(event, data)
    }

    /// Profile names passed to the profile command, in order
    pub fn switch_commands(&self) -> Vec<String> {
        self.switch_history.lock().unwrap().clone()
    }

    pub fn continue_calls(&self) -> usize {
        self.continue_history.lock().unwrap().len()
    }

    /// Text of the last message at the moment each continue was invoked
    pub fn continue_primed_with(&self) -> Vec<String> {
        self.continue_history.lock().unwrap().clone()
    }

    pub fn chat_saves(&self) -> usize {
        self.chat_saves.load(Ordering::SeqCst)
    }

    pub fn settings_saves(&self) -> usize {
        self.settings_saves.load(Ordering::SeqCst)
    }

    /// Highest number of profile changes that were reconnecting at once
    pub fn max_in_flight_swaps(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn play_reconnect(self, name: String, behavior: MockBehavior) {
        let started = Instant::now();

        sleep_until(started + behavior.disconnect_after).await;
        self.connection.send_replace(ConnectionState::Disconnected);

        sleep_until(started + behavior.load_after).await;
        *self.active.lock().unwrap() = Some(name.clone());
        if !behavior.drop_profile_loaded {
            self.bus
                .emit(HostEvent::ProfileLoaded, json!({ "profile": name }));
        }

        if !behavior.stall_reconnect {
            sleep_until(started + behavior.reconnect_after).await;
            self.connection.send_replace(ConnectionState::Connected);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(profile = %name, "Mock host finished profile change");
    }
}

#[async_trait]
impl ProfileCommand for MockHost {
    async fn switch_profile(&self, name: &str) -> HostResult<()> {
        self.switch_history.lock().unwrap().push(name.to_string());
        let behavior = self.behavior.lock().unwrap().clone();

        if behavior.reject_commands {
            return Err(HostError::Rejected(format!("profile '{name}' refused")));
        }
        if !self.profiles.iter().any(|profile| profile.name == name) {
            return Err(HostError::Rejected(format!("unknown profile '{name}'")));
        }

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        tokio::spawn(self.clone().play_reconnect(name.to_string(), behavior));
        Ok(())
    }

    fn active_profile(&self) -> Option<String> {
        self.active_profile_name()
    }

    fn profiles(&self) -> Vec<ProfileRef> {
        self.profiles.clone()
    }
}

impl ConnectionStatusSource for MockHost {
    fn status(&self) -> ConnectionState {
        *self.connection.borrow()
    }
}

#[async_trait]
impl ChatStore for MockHost {
    fn last_message(&self) -> Option<ChatMessage> {
        self.chat.lock().unwrap().last().cloned()
    }

    fn set_last_message_text(&self, text: &str) -> HostResult<()> {
        let mut chat = self.chat.lock().unwrap();
        let last = chat
            .last_mut()
            .ok_or_else(|| HostError::Unavailable("chat is empty".to_string()))?;
        last.text = text.to_string();
        Ok(())
    }

    async fn save_chat(&self) -> HostResult<()> {
        self.chat_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl GenerationControl for MockHost {
    async fn continue_generation(&self) -> HostResult<()> {
        if self.behavior.lock().unwrap().fail_continue {
            return Err(HostError::Unavailable("generation busy".to_string()));
        }
        let last = self
            .last_message()
            .map(|message| message.text)
            .unwrap_or_default();
        self.continue_history.lock().unwrap().push(last);
        Ok(())
    }
}

impl SettingsStore for MockHost {
    fn load(&self, namespace: &str) -> Option<Value> {
        self.settings.lock().unwrap().get(namespace).cloned()
    }

    fn store(&self, namespace: &str, value: Value) {
        self.settings
            .lock()
            .unwrap()
            .insert(namespace.to_string(), value);
    }

    fn save_debounced(&self) {
        self.settings_saves.fetch_add(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MockHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHost")
            .field("active", &self.active_profile_name())
            .field("connection", &self.status())
            .field("profiles", &self.profiles)
            .finish()
    }
}
