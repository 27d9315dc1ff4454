//! Event loop feeding host events into the controller

use crate::controller::GenerationCycleController;
use relay_core::{HostEvent, TriggerKind};
use relay_events::{EventBus, EventPayload};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Subscribes the controller to the host's events.
///
/// Every event the controller reacts to feeds one queue, so handlers run
/// in the order the host emitted them. Events are handled one at a time;
/// a handler that awaits a profile swap holds up the next event until it
/// returns.
pub struct CycleDriver {
    controller: Arc<GenerationCycleController>,
    bus: EventBus,
}

impl CycleDriver {
    pub fn new(controller: Arc<GenerationCycleController>, bus: EventBus) -> Self {
        Self { controller, bus }
    }

    /// Run on a tokio task until `shutdown` turns true
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut settings = self.controller.settings().subscribe();
        let mut trigger = self.controller.trigger_kind();

        let mut events = self.bus.on_many(&[
            trigger.event(),
            HostEvent::GenerationEnded,
            HostEvent::ProfileLoaded,
            HostEvent::AppReady,
        ]);

        info!(trigger = %trigger.event(), "Cycle driver started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(payload) = events.recv() => {
                    self.dispatch(trigger, payload).await;
                }
                Ok(()) = settings.changed() => {
                    let next = settings.borrow_and_update().trigger_kind();
                    if next != trigger {
                        info!(from = %trigger.event(), to = %next.event(), "Rewiring start trigger");
                        events.detach(trigger.event());
                        events.attach(next.event());
                        trigger = next;
                    }
                }
            }
        }

        info!("Cycle driver stopped");
    }

    async fn dispatch(&self, trigger: TriggerKind, payload: EventPayload) {
        match payload.event {
            event if event == trigger.event() => {
                let outcome = self.controller.on_generation_started().await;
                debug!(?outcome, "Generation start handled");
            }
            HostEvent::GenerationEnded => {
                self.controller.on_generation_ended().await;
            }
            HostEvent::ProfileLoaded => {
                self.controller.on_profile_loaded(&payload).await;
            }
            HostEvent::AppReady => self.controller.on_app_ready().await,
            // queued under a trigger that has since been replaced
            other => debug!(event = %other, "Dropping event for previous trigger"),
        }
    }
}
