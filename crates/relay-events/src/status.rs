//! # Connection Status Observation
//!
//! The host exposes a binary connected/disconnected indicator. A profile
//! change shows up as a disconnect edge followed by a reconnect edge, so the
//! swap protocol needs to wait for a given state with a bound. Two
//! observers are provided; a deployment picks one:
//!
//! - [`PollingStatusObserver`] reads the host's status value on an interval
//! - [`WatchStatusObserver`] follows a pushed `tokio::sync::watch` channel

use async_trait::async_trait;
use relay_core::{ConnectionState, ConnectionStatusSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{WaitError, WaitResult};

/// Poll `condition` every `interval` until it holds or `timeout` elapses.
///
/// The condition is checked immediately, then after each interval; the last
/// check happens exactly at the deadline.
pub async fn wait_until<F>(
    mut condition: F,
    timeout: Duration,
    interval: Duration,
    what: &str,
) -> WaitResult<()>
where
    F: FnMut() -> bool + Send,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::ConditionTimeout {
                what: what.to_string(),
                after: timeout,
            });
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Waits for the host's connection indicator to reach a state
#[async_trait]
pub trait ConnectionStatusObserver: Send + Sync {
    fn current(&self) -> ConnectionState;

    /// Resolve once the indicator reads `target`, or fail after `timeout`
    async fn wait_for(&self, target: ConnectionState, timeout: Duration) -> WaitResult<()>;
}

/// Poll-driven observer over a readable status source
#[derive(Clone)]
pub struct PollingStatusObserver {
    source: Arc<dyn ConnectionStatusSource>,
    interval: Duration,
}

impl PollingStatusObserver {
    pub fn new(source: Arc<dyn ConnectionStatusSource>, interval: Duration) -> Self {
        Self { source, interval }
    }
}

#[async_trait]
impl ConnectionStatusObserver for PollingStatusObserver {
    fn current(&self) -> ConnectionState {
        self.source.status()
    }

    async fn wait_for(&self, target: ConnectionState, timeout: Duration) -> WaitResult<()> {
        debug!(%target, ?timeout, interval = ?self.interval, "Polling connection status");
        let source = &self.source;
        wait_until(
            || source.status() == target,
            timeout,
            self.interval,
            &format!("connection to become {target}"),
        )
        .await
    }
}

/// Event-driven observer over a pushed status channel
#[derive(Clone)]
pub struct WatchStatusObserver {
    receiver: watch::Receiver<ConnectionState>,
}

impl WatchStatusObserver {
    pub fn new(receiver: watch::Receiver<ConnectionState>) -> Self {
        Self { receiver }
    }

    /// Create the channel the host adapter publishes status changes on
    pub fn channel(initial: ConnectionState) -> (watch::Sender<ConnectionState>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl ConnectionStatusObserver for WatchStatusObserver {
    fn current(&self) -> ConnectionState {
        *self.receiver.borrow()
    }

    async fn wait_for(&self, target: ConnectionState, timeout: Duration) -> WaitResult<()> {
        debug!(%target, ?timeout, "Watching connection status");
        let mut receiver = self.receiver.clone();
        let reached = async move {
            receiver
                .wait_for(|state| *state == target)
                .await
                .map(|_| ())
        };
        match tokio::time::timeout(timeout, reached).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(WaitError::SourceClosed("connection status channel".to_string())),
            Err(_) => Err(WaitError::ConditionTimeout {
                what: format!("connection to become {target}"),
                after: timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeIndicator(Mutex<ConnectionState>);

    impl ConnectionStatusSource for FakeIndicator {
        fn status(&self) -> ConnectionState {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_immediate_success() {
        let started = Instant::now();
        wait_until(|| true, Duration::from_secs(5), Duration::from_millis(100), "always")
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_times_out_at_deadline() {
        let started = Instant::now();
        let mut checks = 0;
        let result = wait_until(
            || {
                checks += 1;
                false
            },
            Duration::from_millis(5000),
            Duration::from_millis(100),
            "never",
        )
        .await;

        assert!(matches!(result, Err(WaitError::ConditionTimeout { ref what, .. }) if what == "never"));
        assert_eq!(started.elapsed(), Duration::from_millis(5000));
        assert_eq!(checks, 51);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_observer_sees_reconnect() {
        let indicator = Arc::new(FakeIndicator(Mutex::new(ConnectionState::Disconnected)));
        let observer = PollingStatusObserver::new(indicator.clone(), Duration::from_millis(100));

        let flip = indicator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(750)).await;
            *flip.0.lock().unwrap() = ConnectionState::Connected;
        });

        let started = Instant::now();
        observer
            .wait_for(ConnectionState::Connected, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(800));
        assert_eq!(observer.current(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_observer_follows_channel() {
        let (tx, observer) = WatchStatusObserver::channel(ConnectionState::Connected);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send_replace(ConnectionState::Disconnected);
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send_replace(ConnectionState::Connected);
            // Keep the sender alive past the observer's last wait.
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        observer
            .wait_for(ConnectionState::Disconnected, Duration::from_secs(5))
            .await
            .unwrap();
        observer
            .wait_for(ConnectionState::Connected, Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_observer_timeout() {
        let (_tx, observer) = WatchStatusObserver::channel(ConnectionState::Connected);
        let err = observer
            .wait_for(ConnectionState::Disconnected, Duration::from_millis(5000))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_watch_observer_reports_closed_source() {
        let (tx, observer) = WatchStatusObserver::channel(ConnectionState::Connected);
        drop(tx);
        let err = observer
            .wait_for(ConnectionState::Disconnected, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::SourceClosed(_)));
    }
}
