//! In-process bus for named host events
//!
//! The host adapter emits every lifecycle event it observes into an
//! [`EventBus`]; relay components attach listeners by event name. Persistent
//! listeners receive a stream of payloads and detach when their
//! [`Subscription`] is dropped. One-shot listeners are removed the first time
//! their event fires.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::Stream;
use relay_core::HostEvent;
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// Identifies one attached listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a listener receives when its event fires
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPayload {
    pub event: HostEvent,
    pub data: Value,
    pub emitted_at: DateTime<Utc>,
}

impl EventPayload {
    pub fn new(event: HostEvent, data: Value) -> Self {
        Self {
            event,
            data,
            emitted_at: Utc::now(),
        }
    }

    /// Convenience accessor for `{"profile": "<name>"}` style payloads
    pub fn profile_name(&self) -> Option<&str> {
        self.data.get("profile").and_then(Value::as_str)
    }
}

enum Listener {
    Persistent(mpsc::UnboundedSender<EventPayload>),
    Once(oneshot::Sender<EventPayload>),
}

impl Listener {
    fn is_closed(&self) -> bool {
        match self {
            Listener::Persistent(tx) => tx.is_closed(),
            Listener::Once(tx) => tx.is_closed(),
        }
    }
}

/// Cloneable handle to a shared listener registry
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<DashMap<HostEvent, Vec<(ListenerId, Listener)>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Attach a persistent listener
    pub fn on(&self, event: HostEvent) -> Subscription {
        self.on_many(&[event])
    }

    /// Attach one persistent listener to several events.
    ///
    /// Payloads share a single queue, so they arrive in the order they were
    /// emitted regardless of which event they belong to.
    pub fn on_many(&self, events: &[HostEvent]) -> Subscription {
        let (tx, receiver) = mpsc::unbounded_channel();
        let id = self.allocate_id();
        let mut attached = Vec::with_capacity(events.len());
        for &event in events {
            if attached.contains(&event) {
                continue;
            }
            self.listeners
                .entry(event)
                .or_default()
                .push((id, Listener::Persistent(tx.clone())));
            attached.push(event);
        }
        trace!(events = ?attached, ?id, "Attached persistent listener");
        Subscription {
            bus: self.clone(),
            events: attached,
            id,
            receiver,
        }
    }

    /// Attach a listener that fires at most once
    pub fn once(&self, event: HostEvent) -> (ListenerId, oneshot::Receiver<EventPayload>) {
        let (tx, rx) = oneshot::channel();
        let id = self.allocate_id();
        self.listeners
            .entry(event)
            .or_default()
            .push((id, Listener::Once(tx)));
        trace!(%event, ?id, "Attached one-shot listener");
        (id, rx)
    }

    /// Detach a listener; returns false if it was already gone
    pub fn off(&self, event: HostEvent, id: ListenerId) -> bool {
        let Some(mut entry) = self.listeners.get_mut(&event) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|(listener_id, _)| *listener_id != id);
        let removed = entry.len() != before;
        if removed {
            trace!(%event, ?id, "Detached listener");
        }
        removed
    }

    /// Deliver `data` to every listener of `event`; returns how many received it
    pub fn emit(&self, event: HostEvent, data: Value) -> usize {
        let payload = EventPayload::new(event, data);
        let Some(mut entry) = self.listeners.get_mut(&event) else {
            trace!(%event, "Emitted with no listeners");
            return 0;
        };

        let listeners = std::mem::take(entry.value_mut());
        let mut kept = Vec::with_capacity(listeners.len());
        let mut delivered = 0;

        for (id, listener) in listeners {
            match listener {
                Listener::Persistent(tx) => {
                    if tx.send(payload.clone()).is_ok() {
                        delivered += 1;
                        kept.push((id, Listener::Persistent(tx)));
                    }
                }
                Listener::Once(tx) => {
                    if tx.send(payload.clone()).is_ok() {
                        delivered += 1;
                    }
                }
            }
        }

        *entry.value_mut() = kept;
        trace!(%event, delivered, "Emitted event");
        delivered
    }

    fn persistent_sender(
        &self,
        event: HostEvent,
        id: ListenerId,
    ) -> Option<mpsc::UnboundedSender<EventPayload>> {
        let entry = self.listeners.get(&event)?;
        entry.iter().find_map(|(listener_id, listener)| match listener {
            Listener::Persistent(tx) if *listener_id == id => Some(tx.clone()),
            _ => None,
        })
    }

    /// Number of live listeners attached to `event`
    pub fn listener_count(&self, event: HostEvent) -> usize {
        self.listeners
            .get(&event)
            .map(|entry| entry.iter().filter(|(_, l)| !l.is_closed()).count())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<(HostEvent, usize)> = HostEvent::ALL
            .into_iter()
            .map(|event| (event, self.listener_count(event)))
            .filter(|(_, count)| *count > 0)
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

/// A persistent listener on one or more events; detaches on drop
pub struct Subscription {
    bus: EventBus,
    events: Vec<HostEvent>,
    id: ListenerId,
    receiver: mpsc::UnboundedReceiver<EventPayload>,
}

impl Subscription {
    /// Events currently feeding this subscription
    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Start receiving `event` on the existing queue.
    ///
    /// Returns false if it was already attached or the subscription has no
    /// live registration left to share.
    pub fn attach(&mut self, event: HostEvent) -> bool {
        if self.events.contains(&event) {
            return false;
        }
        let Some(tx) = self
            .events
            .iter()
            .find_map(|attached| self.bus.persistent_sender(*attached, self.id))
        else {
            return false;
        };
        self.bus
            .listeners
            .entry(event)
            .or_default()
            .push((self.id, Listener::Persistent(tx)));
        self.events.push(event);
        trace!(%event, id = ?self.id, "Attached event to subscription");
        true
    }

    /// Stop receiving `event`; payloads already queued are kept
    pub fn detach(&mut self, event: HostEvent) -> bool {
        let Some(index) = self.events.iter().position(|attached| *attached == event) else {
            return false;
        };
        self.events.remove(index);
        self.bus.off(event, self.id)
    }

    /// Next payload, or `None` once detached and drained
    pub async fn recv(&mut self) -> Option<EventPayload> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = EventPayload;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for event in &self.events {
            self.bus.off(*event, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_persistent_listener_receives_every_emit() {
        let bus = EventBus::new();
        let mut sub = bus.on(HostEvent::GenerationEnded);

        assert_eq!(bus.emit(HostEvent::GenerationEnded, json!(1)), 1);
        assert_eq!(bus.emit(HostEvent::GenerationEnded, json!(2)), 1);

        assert_eq!(sub.recv().await.unwrap().data, json!(1));
        assert_eq!(sub.next().await.unwrap().data, json!(2));
    }

    #[tokio::test]
    async fn test_once_listener_removed_after_first_delivery() {
        let bus = EventBus::new();
        let (_, rx) = bus.once(HostEvent::ProfileLoaded);
        assert_eq!(bus.listener_count(HostEvent::ProfileLoaded), 1);

        bus.emit(HostEvent::ProfileLoaded, json!({"profile": "Reasoner"}));
        assert_eq!(bus.listener_count(HostEvent::ProfileLoaded), 0);
        assert_eq!(bus.emit(HostEvent::ProfileLoaded, json!(null)), 0);

        let payload = rx.await.unwrap();
        assert_eq!(payload.profile_name(), Some("Reasoner"));
    }

    #[test]
    fn test_dropping_subscription_detaches() {
        let bus = EventBus::new();
        let sub = bus.on(HostEvent::AppReady);
        let other = bus.on(HostEvent::AppReady);
        assert_eq!(bus.listener_count(HostEvent::AppReady), 2);

        drop(sub);
        assert_eq!(bus.listener_count(HostEvent::AppReady), 1);
        drop(other);
        assert_eq!(bus.listener_count(HostEvent::AppReady), 0);
    }

    #[test]
    fn test_events_are_isolated_by_name() {
        let bus = EventBus::new();
        let _started = bus.on(HostEvent::GenerationStarted);
        assert_eq!(bus.emit(HostEvent::UserMessageRendered, json!(null)), 0);
        assert_eq!(bus.emit(HostEvent::GenerationStarted, json!(null)), 1);
    }

    #[tokio::test]
    async fn test_multi_event_subscription_keeps_emit_order() {
        let bus = EventBus::new();
        let mut sub = bus.on_many(&[
            HostEvent::GenerationStarted,
            HostEvent::GenerationEnded,
            HostEvent::GenerationStarted,
        ]);
        assert_eq!(sub.events(), &[HostEvent::GenerationStarted, HostEvent::GenerationEnded]);

        bus.emit(HostEvent::GenerationEnded, json!(1));
        bus.emit(HostEvent::GenerationStarted, json!(2));
        bus.emit(HostEvent::GenerationEnded, json!(3));
        bus.emit(HostEvent::GenerationStarted, json!(4));

        let mut order = Vec::new();
        for _ in 0..4 {
            let payload = sub.recv().await.unwrap();
            order.push((payload.event, payload.data));
        }
        assert_eq!(
            order,
            vec![
                (HostEvent::GenerationEnded, json!(1)),
                (HostEvent::GenerationStarted, json!(2)),
                (HostEvent::GenerationEnded, json!(3)),
                (HostEvent::GenerationStarted, json!(4)),
            ]
        );
    }

    #[tokio::test]
    async fn test_attach_and_detach_share_one_queue() {
        let bus = EventBus::new();
        let mut sub = bus.on_many(&[HostEvent::GenerationEnded, HostEvent::GenerationStarted]);

        bus.emit(HostEvent::GenerationStarted, json!("queued"));
        assert!(sub.detach(HostEvent::GenerationStarted));
        assert!(!sub.detach(HostEvent::GenerationStarted));
        assert!(sub.attach(HostEvent::UserMessageRendered));
        assert!(!sub.attach(HostEvent::UserMessageRendered));

        assert_eq!(bus.emit(HostEvent::GenerationStarted, json!(null)), 0);
        bus.emit(HostEvent::UserMessageRendered, json!("rendered"));

        assert_eq!(sub.recv().await.unwrap().data, json!("queued"));
        assert_eq!(sub.recv().await.unwrap().event, HostEvent::UserMessageRendered);

        drop(sub);
        assert_eq!(bus.listener_count(HostEvent::GenerationEnded), 0);
        assert_eq!(bus.listener_count(HostEvent::UserMessageRendered), 0);
    }

    #[test]
    fn test_off_unknown_listener_is_noop() {
        let bus = EventBus::new();
        let (id, _rx) = bus.once(HostEvent::GenerationStarted);
        assert!(!bus.off(HostEvent::GenerationEnded, id));
        assert!(bus.off(HostEvent::GenerationStarted, id));
        assert!(!bus.off(HostEvent::GenerationStarted, id));
    }
}
