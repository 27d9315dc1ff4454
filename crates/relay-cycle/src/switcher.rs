//! # Profile Switcher
//!
//! Performs one confirmed profile swap. A swap is only considered complete
//! once three signals have been observed in order:
//!
//! 1. the connection indicator leaves the connected state,
//! 2. the host emits its profile-loaded event,
//! 3. the connection indicator returns to connected.
//!
//! The profile-loaded listener is armed before the command is issued so a
//! fast host cannot fire the event before anyone is listening. All three
//! waits are bounded; a swap that cannot be confirmed rolls the phase back
//! so a later revert is not attempted against a profile that never loaded.

use crate::error::{SwapError, SwapResult, SwapStage};
use relay_core::{
    ConnectionState, CycleState, ExtensionConfig, HostEvent, ProfileCommand, RelayRuntimeConfig,
    SwapDirection, SwapPhase, is_unset,
};
use relay_events::{ConnectionStatusObserver, EventWaiter};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// What a successful call actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The host switched and all three confirmations arrived
    Switched {
        from: Option<String>,
        to: String,
    },
    /// The host already had the target selected; no command issued
    AlreadyActive,
    /// Revert requested with no saved response profile
    NothingToRevert,
}

/// Confirmed profile swaps over the host's command and signals
pub struct ProfileSwitcher {
    profiles: Arc<dyn ProfileCommand>,
    waiter: EventWaiter,
    status: Arc<dyn ConnectionStatusObserver>,
    runtime: RelayRuntimeConfig,
}

impl ProfileSwitcher {
    pub fn new(
        profiles: Arc<dyn ProfileCommand>,
        waiter: EventWaiter,
        status: Arc<dyn ConnectionStatusObserver>,
        runtime: RelayRuntimeConfig,
    ) -> Self {
        Self {
            profiles,
            waiter,
            status,
            runtime,
        }
    }

    /// Switch the host to `target`, holding the swap latch in `state`.
    ///
    /// Rejects without touching the host if `target` is unset or another
    /// swap is in flight. When swapping towards reasoning, the host's live
    /// profile is captured as the revert target before the command goes out.
    pub async fn switch_to(
        &self,
        state: &Mutex<CycleState>,
        target: &str,
        direction: SwapDirection,
    ) -> SwapResult<SwapOutcome> {
        self.swap(state, target, direction, None).await
    }

    async fn swap(
        &self,
        state: &Mutex<CycleState>,
        target: &str,
        direction: SwapDirection,
        fallback_response: Option<&str>,
    ) -> SwapResult<SwapOutcome> {
        if is_unset(target) {
            warn!(%direction, "Swap requested without a target profile");
            return Err(SwapError::NoProfileSelected);
        }

        let live = self.profiles.active_profile();
        let (previous_phase, previous_saved) = {
            let mut cycle = state.lock().await;
            if cycle.is_profile_swapping() {
                warn!(%direction, target, phase = ?cycle.phase, "Swap rejected, another swap is in flight");
                return Err(SwapError::SwapInProgress {
                    in_flight: cycle.phase,
                });
            }

            let previous_saved = cycle.saved_response_profile.clone();
            if direction == SwapDirection::ToReasoning && !cycle.is_reasoning_active() {
                let response = live
                    .clone()
                    .or(previous_saved.clone())
                    .or_else(|| fallback_response.map(str::to_string));
                if response.is_none() {
                    warn!(target, "Host reports no active profile, refusing reasoning swap");
                    return Err(SwapError::NoResponseProfile);
                }
                cycle.saved_response_profile = response;
            }

            if live.as_deref() == Some(target) {
                cycle.complete_swap(direction);
                info!(%direction, target, "Target profile already active, skipping swap");
                return Ok(SwapOutcome::AlreadyActive);
            }

            let previous_phase = cycle
                .begin_swap(direction)
                .map_err(|in_flight| SwapError::SwapInProgress { in_flight })?;
            (previous_phase, previous_saved)
        };

        info!(%direction, from = ?live, to = target, "Switching profile");

        match self.confirm_switch(target).await {
            Ok(()) => {
                state.lock().await.complete_swap(direction);
                info!(%direction, to = target, "Profile swap confirmed");
                Ok(SwapOutcome::Switched {
                    from: live,
                    to: target.to_string(),
                })
            }
            Err(e) => {
                let mut cycle = state.lock().await;
                cycle.abort_swap(previous_phase);
                if direction == SwapDirection::ToReasoning {
                    cycle.saved_response_profile = previous_saved;
                }
                warn!(%direction, to = target, error = %e, phase = ?cycle.phase, "Profile swap failed");
                Err(e)
            }
        }
    }

    /// Swap to the configured reasoning profile.
    ///
    /// `fallback_response` is saved as the revert target when the host
    /// cannot name its live profile.
    pub async fn engage_reasoning(
        &self,
        state: &Mutex<CycleState>,
        config: &ExtensionConfig,
        fallback_response: Option<&str>,
    ) -> SwapResult<SwapOutcome> {
        let Some(profile) = config.reasoning_profile() else {
            warn!("Reasoning profile is not configured");
            return Err(SwapError::NoProfileSelected);
        };
        self.swap(
            state,
            &profile.name,
            SwapDirection::ToReasoning,
            fallback_response,
        )
        .await
    }

    /// Swap back to the saved response profile.
    ///
    /// A no-op when nothing was saved, so calling it twice is harmless.
    pub async fn revert(&self, state: &Mutex<CycleState>) -> SwapResult<SwapOutcome> {
        let saved = {
            let mut cycle = state.lock().await;
            match cycle.saved_response_profile.clone() {
                Some(saved) => saved,
                None => {
                    if cycle.phase == SwapPhase::ReasoningActive {
                        warn!("Reasoning marked active with no response profile to return to");
                        cycle.phase = SwapPhase::Idle;
                    }
                    debug!("Nothing to revert");
                    return Ok(SwapOutcome::NothingToRevert);
                }
            }
        };
        self.switch_to(state, &saved, SwapDirection::ToResponse)
            .await
    }

    async fn confirm_switch(&self, target: &str) -> SwapResult<()> {
        let loaded = self
            .waiter
            .arm(HostEvent::ProfileLoaded, self.runtime.profile_loaded_timeout);

        self.profiles
            .switch_profile(target)
            .await
            .map_err(|source| SwapError::HostCommandRejected {
                profile: target.to_string(),
                source,
            })?;

        self.status
            .wait_for(ConnectionState::Disconnected, self.runtime.status_timeout)
            .await
            .map_err(|source| SwapError::SwapTimeout {
                stage: SwapStage::Disconnect,
                source,
            })?;
        debug!(target, "Host disconnected for profile change");

        let payload = loaded.wait().await.map_err(|source| SwapError::SwapTimeout {
            stage: SwapStage::ProfileLoaded,
            source,
        })?;
        debug!(target, loaded = ?payload.profile_name(), "Profile loaded");

        self.status
            .wait_for(ConnectionState::Connected, self.runtime.status_timeout)
            .await
            .map_err(|source| SwapError::SwapTimeout {
                stage: SwapStage::Reconnect,
                source,
            })?;
        Ok(())
    }
}

impl std::fmt::Debug for ProfileSwitcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileSwitcher")
            .field("active_profile", &self.profiles.active_profile())
            .field("connection", &self.status.current())
            .field("runtime", &self.runtime)
            .finish()
    }
}
