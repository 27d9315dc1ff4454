//! Assembles the relay from host bindings and runtime configuration

use crate::controller::GenerationCycleController;
use crate::driver::CycleDriver;
use crate::settings::SettingsManager;
use crate::switcher::ProfileSwitcher;
use relay_core::{
    ConfigError, ConnectionState, HostBindings, RelayRuntimeConfig, StatusObserverKind,
};
use relay_events::{
    ConnectionStatusObserver, EventBus, EventWaiter, PollingStatusObserver, WatchStatusObserver,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// A wired relay: controller plus the bus it listens on
#[derive(Debug, Clone)]
pub struct Relay {
    controller: Arc<GenerationCycleController>,
    bus: EventBus,
}

impl Relay {
    pub fn builder(host: HostBindings, bus: EventBus) -> RelayBuilder {
        RelayBuilder {
            host,
            bus,
            runtime: RelayRuntimeConfig::default(),
            status_feed: None,
        }
    }

    pub fn controller(&self) -> &Arc<GenerationCycleController> {
        &self.controller
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Start the event loop on the current tokio runtime
    pub fn start(&self) -> RelayHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = CycleDriver::new(self.controller.clone(), self.bus.clone()).spawn(receiver);
        RelayHandle { shutdown, task }
    }
}

pub struct RelayBuilder {
    host: HostBindings,
    bus: EventBus,
    runtime: RelayRuntimeConfig,
    status_feed: Option<watch::Receiver<ConnectionState>>,
}

impl RelayBuilder {
    #[must_use]
    pub fn runtime(mut self, runtime: RelayRuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Connection status change feed, required for [`StatusObserverKind::Watch`]
    #[must_use]
    pub fn status_feed(mut self, feed: watch::Receiver<ConnectionState>) -> Self {
        self.status_feed = Some(feed);
        self
    }

    pub fn build(self) -> Result<Relay, ConfigError> {
        let status: Arc<dyn ConnectionStatusObserver> = match self.runtime.status_observer {
            StatusObserverKind::Poll => Arc::new(PollingStatusObserver::new(
                self.host.connection.clone(),
                self.runtime.status_poll_interval,
            )),
            StatusObserverKind::Watch => {
                let feed = self.status_feed.ok_or_else(|| {
                    ConfigError::ValidationError(
                        "watch status observer selected but no status feed supplied".to_string(),
                    )
                })?;
                Arc::new(WatchStatusObserver::new(feed))
            }
        };

        let switcher = ProfileSwitcher::new(
            self.host.profiles.clone(),
            EventWaiter::new(self.bus.clone()),
            status,
            self.runtime.clone(),
        );
        let settings = Arc::new(SettingsManager::load(self.host.settings.clone()));
        info!(observer = ?self.runtime.status_observer, "Relay assembled");

        Ok(Relay {
            controller: Arc::new(GenerationCycleController::new(
                self.host,
                switcher,
                settings,
                self.runtime,
            )),
            bus: self.bus,
        })
    }
}

/// Running event loop
pub struct RelayHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Stop the loop after the event currently being handled
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cycle driver task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::RelayRuntimeConfigBuilder;
    use relay_testing::MockHost;

    #[test]
    fn test_watch_observer_requires_feed() {
        let bus = EventBus::new();
        let host = Arc::new(MockHost::new(bus.clone(), "Writer", &["Writer"]));
        let runtime = RelayRuntimeConfigBuilder::new()
            .status_observer(StatusObserverKind::Watch)
            .build()
            .unwrap();

        let result = Relay::builder(HostBindings::from_host(host.clone()), bus.clone())
            .runtime(runtime.clone())
            .build();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let relay = Relay::builder(HostBindings::from_host(host.clone()), bus)
            .runtime(runtime)
            .status_feed(host.status_feed())
            .build();
        assert!(relay.is_ok());
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let bus = EventBus::new();
        let host = Arc::new(MockHost::new(bus.clone(), "Writer", &["Writer"]));
        let relay = Relay::builder(HostBindings::from_host(host), bus.clone())
            .build()
            .unwrap();

        let handle = relay.start();
        tokio::task::yield_now().await;
        assert_eq!(relay.bus().listener_count(relay_core::HostEvent::AppReady), 1);

        handle.shutdown().await;
        assert_eq!(bus.listener_count(relay_core::HostEvent::AppReady), 0);
    }
}
