//! End-to-end generation cycles driven through the event bus
//!
//! Each test wires a full relay (settings, switcher, controller, driver)
//! to a simulated host and plays host events in order, the way a chat
//! frontend would.

use reasoning_relay::events::EventBus;
use reasoning_relay::{
    CycleState, ExtensionConfig, HostBindings, HostEvent, Relay, RelayHandle,
    SETTINGS_NAMESPACE, SettingsStore, StartOutcome, SwapDirection, SwapOutcome, SwapPhase,
};
use reasoning_relay::core::ChatMessage;
use relay_testing::{MockBehavior, MockHost};
use std::sync::Arc;
use std::time::Duration;

const SWAP_SETTLE: Duration = Duration::from_secs(2);

fn config(reasoning: &str) -> ExtensionConfig {
    ExtensionConfig {
        reasoning_profile_id: reasoning.to_lowercase(),
        reasoning_profile_name: reasoning.to_string(),
        is_extension_active: true,
        ..ExtensionConfig::default()
    }
}

async fn running_relay(
    config: ExtensionConfig,
    active: &str,
    profiles: &[&str],
) -> (Arc<MockHost>, Relay, RelayHandle) {
    let bus = EventBus::new();
    let host = Arc::new(MockHost::new(bus.clone(), active, profiles));
    host.store(SETTINGS_NAMESPACE, config.to_value());

    let relay = Relay::builder(HostBindings::from_host(host.clone()), bus)
        .build()
        .expect("default runtime config is valid");
    let handle = relay.start();
    tokio::task::yield_now().await;

    host.emit(HostEvent::AppReady);
    tokio::time::sleep(Duration::from_millis(10)).await;
    (host, relay, handle)
}

mod generation_cycle_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_plain_cycle_swaps_out_and_back() {
        let (host, relay, handle) =
            running_relay(config("Reasoning"), "Main", &["Main", "Reasoning"]).await;

        host.push_message(ChatMessage::user("explain monads"));
        host.emit(HostEvent::GenerationStarted);
        tokio::time::sleep(SWAP_SETTLE).await;
        assert_eq!(host.switch_commands(), vec!["Reasoning"]);
        assert_eq!(
            relay.controller().state().await.phase,
            SwapPhase::ReasoningActive
        );

        host.emit(HostEvent::GenerationEnded);
        tokio::time::sleep(SWAP_SETTLE).await;
        assert_eq!(host.switch_commands(), vec!["Reasoning", "Main"]);
        assert_eq!(host.active_profile_name().as_deref(), Some("Main"));
        assert!(relay.controller().state().await.is_idle());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_end_emitted_together_still_revert() {
        let (host, relay, handle) =
            running_relay(config("Reasoning"), "Main", &["Main", "Reasoning"]).await;

        host.push_message(ChatMessage::user("quick one"));
        host.emit(HostEvent::GenerationStarted);
        host.emit(HostEvent::GenerationEnded);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(host.switch_commands(), vec!["Reasoning", "Main"]);
        assert_eq!(host.active_profile_name().as_deref(), Some("Main"));
        assert!(relay.controller().state().await.is_idle());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_assistant_tail_skips_cycle_when_user_last_only() {
        let (host, relay, handle) = running_relay(
            ExtensionConfig {
                only_trigger_when_user_last: true,
                ..config("Reasoning")
            },
            "Main",
            &["Main", "Reasoning"],
        )
        .await;

        host.push_message(ChatMessage::assistant("unprompted follow-up"));
        host.emit(HostEvent::UserMessageRendered);
        host.emit(HostEvent::GenerationStarted);
        tokio::time::sleep(SWAP_SETTLE).await;

        assert!(host.switch_commands().is_empty());
        assert_eq!(relay.controller().state().await, CycleState::new());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_message_rendered_starts_cycle_when_user_last_only() {
        let (host, _relay, handle) = running_relay(
            ExtensionConfig {
                only_trigger_when_user_last: true,
                ..config("Reasoning")
            },
            "Main",
            &["Main", "Reasoning"],
        )
        .await;

        host.push_message(ChatMessage::user("go"));
        host.emit(HostEvent::UserMessageRendered);
        tokio::time::sleep(SWAP_SETTLE).await;
        assert_eq!(host.switch_commands(), vec!["Reasoning"]);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_profile_is_immediate_noop() {
        let (host, relay, handle) =
            running_relay(config("GPT-Main"), "GPT-Main", &["GPT-Main"]).await;
        handle.shutdown().await;

        let controller = relay.controller();
        let started_at = tokio::time::Instant::now();
        let outcome = controller.on_generation_started().await;

        assert_eq!(outcome, StartOutcome::Engaged(SwapOutcome::AlreadyActive));
        assert_eq!(started_at.elapsed(), Duration::ZERO);
        assert!(host.switch_commands().is_empty());
        assert_eq!(controller.state().await.phase, SwapPhase::ReasoningActive);

        controller.on_generation_ended().await;
        assert!(host.switch_commands().is_empty());
        assert!(controller.state().await.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_profile_loaded_event_times_out_without_revert() {
        let (host, relay, handle) =
            running_relay(config("Reasoning"), "Main", &["Main", "Reasoning"]).await;
        host.set_behavior(MockBehavior {
            drop_profile_loaded: true,
            ..MockBehavior::default()
        });

        host.push_message(ChatMessage::user("hello"));
        host.emit(HostEvent::GenerationStarted);
        tokio::time::sleep(Duration::from_secs(6)).await;

        let state = relay.controller().state().await;
        assert!(!state.is_reasoning_active());
        assert!(state.saved_response_profile.is_none());

        host.emit(HostEvent::GenerationEnded);
        tokio::time::sleep(SWAP_SETTLE).await;
        assert_eq!(host.switch_commands(), vec!["Reasoning"]);
        assert!(relay.controller().state().await.is_idle());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_continue_primes_and_continues_once() {
        let (host, relay, handle) = running_relay(
            ExtensionConfig {
                auto_continue_after_reasoning: true,
                post_reasoning_prefix: "Final answer:".into(),
                ..config("Reasoning")
            },
            "Main",
            &["Main", "Reasoning"],
        )
        .await;

        host.push_message(ChatMessage::user("prove it"));
        host.emit(HostEvent::GenerationStarted);
        tokio::time::sleep(SWAP_SETTLE).await;
        host.push_message(ChatMessage::assistant("<think>...</think>"));

        host.emit(HostEvent::GenerationEnded);
        tokio::time::sleep(SWAP_SETTLE).await;
        assert_eq!(host.continue_primed_with(), vec!["Final answer:"]);
        let state = relay.controller().state().await;
        assert!(state.auto_continuing && state.mid_generation_cycle);
        assert_eq!(host.active_profile_name().as_deref(), Some("Main"));

        // the host runs the continuation
        host.emit(HostEvent::GenerationStarted);
        tokio::time::sleep(SWAP_SETTLE).await;
        host.emit(HostEvent::GenerationEnded);
        tokio::time::sleep(SWAP_SETTLE).await;

        assert!(relay.controller().state().await.is_idle());
        assert_eq!(host.continue_calls(), 1);
        assert_eq!(host.switch_commands(), vec!["Reasoning", "Main"]);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_profile_change_becomes_response_profile() {
        let (host, relay, handle) =
            running_relay(config("Reasoning"), "Main", &["Main", "Alt", "Reasoning"]).await;

        host.set_active_profile("Alt");
        host.emit_with(
            HostEvent::ProfileLoaded,
            serde_json::json!({ "profile": "Alt" }),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            relay.controller().known_response_profile().await.as_deref(),
            Some("Alt")
        );

        host.push_message(ChatMessage::user("q"));
        host.emit(HostEvent::GenerationStarted);
        tokio::time::sleep(SWAP_SETTLE).await;
        host.emit(HostEvent::GenerationEnded);
        tokio::time::sleep(SWAP_SETTLE).await;

        assert_eq!(host.active_profile_name().as_deref(), Some("Alt"));
        assert_eq!(
            relay.controller().known_response_profile().await.as_deref(),
            Some("Alt")
        );

        handle.shutdown().await;
    }
}

mod operator_tests {
    use super::*;
    use reasoning_relay::{CommandReply, OperatorCommand};

    #[tokio::test(start_paused = true)]
    async fn test_toggle_persists_through_host_settings() {
        let (host, relay, handle) =
            running_relay(config("Reasoning"), "Main", &["Main", "Reasoning"]).await;
        let saves_before = host.settings_saves();

        let command: OperatorCommand = "/relay-toggle".parse().unwrap();
        let reply = relay.controller().execute(command).await;
        assert_eq!(reply, CommandReply::Toggled { active: false });
        assert_eq!(
            host.load(SETTINGS_NAMESPACE).unwrap()["isExtensionActive"],
            false
        );
        assert_eq!(host.settings_saves(), saves_before + 1);

        // inactive now, generation passes through untouched
        host.push_message(ChatMessage::user("hi"));
        host.emit(HostEvent::GenerationStarted);
        tokio::time::sleep(SWAP_SETTLE).await;
        assert!(host.switch_commands().is_empty());

        handle.shutdown().await;
    }
}

mod switcher_tests {
    use super::*;
    use reasoning_relay::SwapError;
    use reasoning_relay::RelayRuntimeConfigBuilder;
    use reasoning_relay::core::StatusObserverKind;
    use tokio::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_watch_observer_relay_completes_cycle() {
        let bus = EventBus::new();
        let host = Arc::new(MockHost::new(bus.clone(), "Main", &["Main", "Reasoning"]));
        host.store(SETTINGS_NAMESPACE, config("Reasoning").to_value());
        let runtime = RelayRuntimeConfigBuilder::new()
            .status_observer(StatusObserverKind::Watch)
            .build()
            .unwrap();

        let relay = Relay::builder(HostBindings::from_host(host.clone()), bus)
            .runtime(runtime)
            .status_feed(host.status_feed())
            .build()
            .unwrap();
        relay.controller().on_app_ready().await;

        relay.controller().on_generation_started().await;
        let ended = relay.controller().on_generation_ended().await;
        assert!(ended.reverted);
        assert_eq!(host.switch_commands(), vec!["Reasoning", "Main"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_during_swap_never_reaches_host() {
        let bus = EventBus::new();
        let host = Arc::new(MockHost::new(bus.clone(), "Main", &["Main", "Reasoning"]));
        let relay = Relay::builder(HostBindings::from_host(host.clone()), bus)
            .build()
            .unwrap();
        let state = Mutex::new(CycleState::new());

        let switcher = standalone_switcher(&relay, &host);
        let (first, second) = tokio::join!(
            switcher.switch_to(&state, "Reasoning", SwapDirection::ToReasoning),
            async {
                tokio::time::sleep(Duration::from_millis(1)).await;
                switcher
                    .switch_to(&state, "Main", SwapDirection::ToResponse)
                    .await
            }
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(SwapError::SwapInProgress { .. })));
        assert_eq!(host.switch_commands(), vec!["Reasoning"]);
        assert_eq!(host.max_in_flight_swaps(), 1);
    }

    fn standalone_switcher(relay: &Relay, host: &Arc<MockHost>) -> reasoning_relay::ProfileSwitcher {
        reasoning_relay::ProfileSwitcher::new(
            host.clone(),
            reasoning_relay::events::EventWaiter::new(relay.bus().clone()),
            Arc::new(reasoning_relay::events::PollingStatusObserver::new(
                host.clone(),
                Duration::from_millis(100),
            )),
            reasoning_relay::RelayRuntimeConfig::default(),
        )
    }
}
