//! # Generation Cycle Controller
//!
//! Reacts to the host's generation lifecycle. At generation start the host
//! is moved onto the reasoning profile; at generation end it is moved back
//! and, when auto-continue is enabled, a second generation is started so
//! the response profile can write the answer. All flags live in one
//! [`CycleState`] behind a single lock, and every handler returns an
//! outcome value describing what it did.

use crate::commands::{CommandReply, OperatorCommand};
use crate::error::SwapError;
use crate::settings::SettingsManager;
use crate::switcher::{ProfileSwitcher, SwapOutcome};
use relay_core::{
    CycleState, ExtensionConfig, HostBindings, RelayRuntimeConfig, SwapDirection, SwapPhase,
    TriggerKind,
};
use relay_events::EventPayload;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// What the generation-started handler did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Extension inactive or the host is still loading
    Ignored,
    /// The last message was not from the user
    SkippedNotUserLast,
    /// Reasoning profile engaged (or already active)
    Engaged(SwapOutcome),
    /// Swap failed; generation proceeds on whatever profile is active
    Degraded(SwapError),
    /// Start of the auto-continued generation; no swap attempted
    PrimedContinuation,
}

/// What the generation-ended handler did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOutcome {
    pub ignored: bool,
    pub reverted: bool,
    pub revert_error: Option<SwapError>,
    pub auto_continue_triggered: bool,
    pub cycle_finished: bool,
}

impl EndOutcome {
    fn ignored() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }
}

pub struct GenerationCycleController {
    host: HostBindings,
    switcher: ProfileSwitcher,
    settings: Arc<SettingsManager>,
    runtime: RelayRuntimeConfig,
    state: Arc<Mutex<CycleState>>,
    known_response_profile: RwLock<Option<String>>,
    app_loading: AtomicBool,
}

impl GenerationCycleController {
    pub fn new(
        host: HostBindings,
        switcher: ProfileSwitcher,
        settings: Arc<SettingsManager>,
        runtime: RelayRuntimeConfig,
    ) -> Self {
        Self {
            host,
            switcher,
            settings,
            runtime,
            state: Arc::new(Mutex::new(CycleState::new())),
            known_response_profile: RwLock::new(None),
            app_loading: AtomicBool::new(true),
        }
    }

    pub fn settings(&self) -> &Arc<SettingsManager> {
        &self.settings
    }

    /// Copy of the current cycle state
    pub async fn state(&self) -> CycleState {
        self.state.lock().await.clone()
    }

    /// Last response profile seen outside a relay-driven swap
    pub async fn known_response_profile(&self) -> Option<String> {
        self.known_response_profile.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.app_loading.load(Ordering::SeqCst)
    }

    /// Which host event starts a cycle under the current settings
    pub fn trigger_kind(&self) -> TriggerKind {
        self.settings.snapshot().trigger_kind()
    }

    /// Host finished loading; start reacting to generations
    pub async fn on_app_ready(&self) {
        let active = self.host.profiles.active_profile();
        *self.known_response_profile.write().await = active.clone();
        self.state.lock().await.reset();
        self.app_loading.store(false, Ordering::SeqCst);
        info!(response_profile = ?active, "Host ready");
    }

    pub async fn on_generation_started(&self) -> StartOutcome {
        let config = self.settings.snapshot();
        if !config.is_extension_active || self.is_loading() {
            debug!(
                active = config.is_extension_active,
                loading = self.is_loading(),
                "Generation start ignored"
            );
            return StartOutcome::Ignored;
        }

        let auto_continuing = self.state.lock().await.auto_continuing;
        if !auto_continuing
            && config.only_trigger_when_user_last
            && self
                .host
                .chat
                .last_message()
                .is_some_and(|last| !last.is_from_user)
        {
            info!("Last message is not from the user, skipping reasoning swap");
            return StartOutcome::SkippedNotUserLast;
        }

        self.state.lock().await.mid_generation_cycle = true;

        if auto_continuing {
            debug!("Continuation generation started");
            self.prime_continuation(&config).await;
            return StartOutcome::PrimedContinuation;
        }

        if self.state.lock().await.phase == SwapPhase::ReasoningActive {
            warn!("Reasoning profile still active from an earlier cycle, reverting first");
            if let Err(e) = self.switcher.revert(&self.state).await {
                error!(error = %e, "Could not restore response profile, proceeding without swap");
                return StartOutcome::Degraded(e);
            }
        }

        let known = self.known_response_profile().await;
        match self
            .switcher
            .engage_reasoning(&self.state, &config, known.as_deref())
            .await
        {
            Ok(outcome) => {
                info!(reasoning_profile = %config.reasoning_profile_name, "Reasoning profile engaged");
                StartOutcome::Engaged(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Reasoning swap failed, generation proceeds on current profile");
                StartOutcome::Degraded(e)
            }
        }
    }

    pub async fn on_generation_ended(&self) -> EndOutcome {
        let config = self.settings.snapshot();
        if !config.is_extension_active || self.is_loading() {
            return EndOutcome::ignored();
        }

        tokio::time::sleep(self.runtime.settle_delay).await;

        let mut outcome = EndOutcome::default();
        if self.state.lock().await.phase == SwapPhase::ReasoningActive {
            match self.switcher.revert(&self.state).await {
                Ok(SwapOutcome::NothingToRevert) => {}
                Ok(_) => outcome.reverted = true,
                Err(e) => {
                    error!(error = %e, "Failed to restore response profile");
                    outcome.revert_error = Some(e);
                }
            }
        }

        let continue_now = {
            let mut cycle = self.state.lock().await;
            if !config.auto_continue_after_reasoning {
                if cycle.mid_generation_cycle {
                    outcome.cycle_finished = true;
                }
                cycle.finish_cycle();
                false
            } else if cycle.auto_continuing && cycle.mid_generation_cycle {
                cycle.finish_cycle();
                outcome.cycle_finished = true;
                false
            } else if cycle.mid_generation_cycle {
                cycle.auto_continuing = true;
                true
            } else {
                false
            }
        };

        if continue_now {
            self.prime_continuation(&config).await;
            info!("Triggering auto-continue on response profile");
            match self.host.generation.continue_generation().await {
                Ok(()) => outcome.auto_continue_triggered = true,
                Err(e) => {
                    error!(error = %e, "Continue action failed, closing cycle");
                    self.state.lock().await.finish_cycle();
                    outcome.cycle_finished = true;
                }
            }
        }

        debug!(?outcome, "Generation end handled");
        outcome
    }

    /// Track manual profile changes made outside the relay's own swaps.
    ///
    /// Returns whether the known response profile was updated.
    pub async fn on_profile_loaded(&self, payload: &EventPayload) -> bool {
        let busy = {
            let cycle = self.state.lock().await;
            cycle.is_profile_swapping()
                || cycle.is_reasoning_active()
                || cycle.mid_generation_cycle
                || cycle.auto_continuing
        };
        if busy || self.is_loading() {
            return false;
        }

        let profile = payload
            .profile_name()
            .map(str::to_string)
            .or_else(|| self.host.profiles.active_profile());
        debug!(response_profile = ?profile, "Response profile updated");
        *self.known_response_profile.write().await = profile;
        true
    }

    /// Run an operator command; the master switch is not consulted.
    pub async fn execute(&self, command: OperatorCommand) -> CommandReply {
        info!(%command, "Operator command");
        let result = match command {
            OperatorCommand::SwapToReasoning => {
                let config = self.settings.snapshot();
                let known = self.known_response_profile().await;
                self.switcher
                    .engage_reasoning(&self.state, &config, known.as_deref())
                    .await
            }
            OperatorCommand::SwapToResponse => {
                let has_saved = self.state.lock().await.saved_response_profile.is_some();
                match self.known_response_profile().await {
                    Some(known) if !has_saved => {
                        self.switcher
                            .switch_to(&self.state, &known, SwapDirection::ToResponse)
                            .await
                    }
                    _ => self.switcher.revert(&self.state).await,
                }
            }
            OperatorCommand::ToggleActive => {
                let active = self.settings.toggle_active();
                info!(active, "Relay toggled");
                return CommandReply::Toggled { active };
            }
        };

        match result {
            Ok(outcome) => {
                debug!(%command, ?outcome, "Operator command completed");
                CommandReply::Ok
            }
            Err(e) => {
                warn!(%command, error = %e, "Operator command failed");
                CommandReply::Failed(e)
            }
        }
    }

    /// Put the continuation prefix in the last message, unless it is already there.
    async fn prime_continuation(&self, config: &ExtensionConfig) -> bool {
        let prefix = config.post_reasoning_prefix.as_str();
        if self
            .host
            .chat
            .last_message()
            .is_some_and(|last| last.text == prefix)
        {
            debug!("Last message already primed");
            return false;
        }

        if let Err(e) = self.host.chat.set_last_message_text(prefix) {
            warn!(error = %e, "Could not prime last message");
            return false;
        }
        if let Err(e) = self.host.chat.save_chat().await {
            warn!(error = %e, "Could not save primed chat");
        }
        tokio::time::sleep(self.runtime.continue_settle_delay).await;
        true
    }
}

impl std::fmt::Debug for GenerationCycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationCycleController")
            .field("host", &self.host)
            .field("settings", &self.settings)
            .field("loading", &self.is_loading())
            .finish()
    }
}
