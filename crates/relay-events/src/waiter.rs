//! One-shot event waits with a deadline
//!
//! Arming registers the listener immediately and starts the deadline, so a
//! caller can arm, trigger the host action that should produce the event,
//! and only then await the result without missing an early emit.

use relay_core::HostEvent;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::bus::{EventBus, EventPayload, ListenerId};
use crate::error::{WaitError, WaitResult};

/// Creates one-shot waits on an [`EventBus`]
#[derive(Debug, Clone)]
pub struct EventWaiter {
    bus: EventBus,
}

impl EventWaiter {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Attach a one-shot listener for `event` whose deadline starts now
    pub fn arm(&self, event: HostEvent, timeout: Duration) -> PendingEvent {
        let (id, receiver) = self.bus.once(event);
        debug!(%event, ?timeout, "Armed event wait");
        PendingEvent {
            bus: self.bus.clone(),
            event,
            id,
            receiver,
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    /// Arm and wait in one step
    pub async fn wait_for(&self, event: HostEvent, timeout: Duration) -> WaitResult<EventPayload> {
        self.arm(event, timeout).wait().await
    }
}

/// An armed wait; dropping it detaches the listener
#[derive(Debug)]
pub struct PendingEvent {
    bus: EventBus,
    event: HostEvent,
    id: ListenerId,
    receiver: oneshot::Receiver<EventPayload>,
    timeout: Duration,
    deadline: Instant,
}

impl PendingEvent {
    pub fn event(&self) -> HostEvent {
        self.event
    }

    /// Resolve with the first payload, or fail once the deadline passes
    pub async fn wait(mut self) -> WaitResult<EventPayload> {
        match tokio::time::timeout_at(self.deadline, &mut self.receiver).await {
            Ok(Ok(payload)) => {
                debug!(event = %self.event, "Received awaited event");
                Ok(payload)
            }
            Ok(Err(_)) => Err(WaitError::Detached(self.event)),
            Err(_) => {
                warn!(event = %self.event, timeout = ?self.timeout, "Timed out waiting for event");
                Err(WaitError::Timeout {
                    event: self.event,
                    after: self.timeout,
                })
            }
        }
    }
}

impl Drop for PendingEvent {
    fn drop(&mut self) {
        // Already gone after a delivery; this only matters on timeout or cancel.
        self.bus.off(self.event, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_wait_resolves_with_payload() {
        let bus = EventBus::new();
        let waiter = EventWaiter::new(bus.clone());
        let pending = waiter.arm(HostEvent::ProfileLoaded, Duration::from_secs(5));

        let emitter = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            emitter.emit(HostEvent::ProfileLoaded, json!({"profile": "Reasoner"}));
        });

        let payload = pending.wait().await.unwrap();
        assert_eq!(payload.profile_name(), Some("Reasoner"));
        assert_eq!(bus.listener_count(HostEvent::ProfileLoaded), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_detaches_listener() {
        let bus = EventBus::new();
        let waiter = EventWaiter::new(bus.clone());

        let result = waiter
            .wait_for(HostEvent::ProfileLoaded, Duration::from_millis(5000))
            .await;

        assert_eq!(
            result.unwrap_err(),
            WaitError::Timeout {
                event: HostEvent::ProfileLoaded,
                after: Duration::from_millis(5000),
            }
        );
        assert_eq!(bus.listener_count(HostEvent::ProfileLoaded), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_emitted_before_wait_is_not_missed() {
        let bus = EventBus::new();
        let waiter = EventWaiter::new(bus.clone());
        let pending = waiter.arm(HostEvent::ProfileLoaded, Duration::from_secs(5));

        bus.emit(HostEvent::ProfileLoaded, json!(null));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(pending.wait().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_counts_from_arming() {
        let bus = EventBus::new();
        let waiter = EventWaiter::new(bus.clone());
        let pending = waiter.arm(HostEvent::ProfileLoaded, Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(6)).await;
        bus.emit(HostEvent::GenerationEnded, json!(null));

        let started = Instant::now();
        assert!(pending.wait().await.unwrap_err().is_timeout());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_cancelled_wait_leaves_no_listener() {
        let bus = EventBus::new();
        let waiter = EventWaiter::new(bus.clone());
        let pending = waiter.arm(HostEvent::GenerationStarted, Duration::from_secs(1));
        assert_eq!(bus.listener_count(HostEvent::GenerationStarted), 1);
        drop(pending);
        assert_eq!(bus.listener_count(HostEvent::GenerationStarted), 0);
    }
}
