//! Scripted generation cycles against a [`MockHost`]

use crate::error::CliResult;
use clap::Args;
use relay_core::{ChatMessage, HostBindings, RelayRuntimeConfigBuilder, SettingsStore};
use relay_cycle::{JsonFileSettingsStore, OperatorCommand, Relay};
use relay_events::EventBus;
use relay_testing::{MockBehavior, MockHost};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SimulateOptions {
    /// Profile the simulated host starts on
    #[arg(long, default_value = "Writer")]
    pub response: String,
    /// Additional profiles the host offers
    #[arg(long = "profile", default_values_t = vec!["Thinker".to_string()])]
    pub profiles: Vec<String>,
    /// Number of user turns to play
    #[arg(long, default_value_t = 1)]
    pub turns: usize,
    /// Operator command to run before the first turn
    #[arg(long)]
    pub command: Option<OperatorCommand>,
    /// Host never emits the profile-loaded event
    #[arg(long)]
    pub drop_loaded: bool,
    /// Host never reconnects after a profile change
    #[arg(long)]
    pub stall_reconnect: bool,
    /// Host refuses profile commands
    #[arg(long)]
    pub reject: bool,
}

pub async fn run_simulation(settings_path: &Path, options: SimulateOptions) -> CliResult<()> {
    let runtime = RelayRuntimeConfigBuilder::from_env()?.build()?;
    let store = Arc::new(JsonFileSettingsStore::open(
        settings_path,
        runtime.settings_debounce,
    ));

    let bus = EventBus::new();
    let mut names = vec![options.response.as_str()];
    names.extend(options.profiles.iter().map(String::as_str));
    let host = Arc::new(MockHost::new(bus.clone(), &options.response, &names));
    host.set_behavior(MockBehavior {
        drop_profile_loaded: options.drop_loaded,
        stall_reconnect: options.stall_reconnect,
        reject_commands: options.reject,
        ..MockBehavior::default()
    });

    let bindings = HostBindings::from_host(host.clone()).with_settings(store.clone());
    let relay = Relay::builder(bindings, bus)
        .runtime(runtime)
        .status_feed(host.status_feed())
        .build()?;
    let controller = relay.controller().clone();
    controller.on_app_ready().await;

    if let Some(command) = options.command {
        let reply = controller.execute(command).await;
        println!("{command}: {reply}");
    }

    for turn in 1..=options.turns {
        info!(turn, "Simulated turn");
        host.push_message(ChatMessage::user(format!("question {turn}")));

        let started = controller.on_generation_started().await;
        println!("turn {turn} start: {started:?}");
        host.push_message(ChatMessage::assistant(format!("reasoning {turn}")));

        let continues_before = host.continue_calls();
        let ended = controller.on_generation_ended().await;
        println!("turn {turn} end: {ended:?}");

        if host.continue_calls() > continues_before {
            let started = controller.on_generation_started().await;
            println!("turn {turn} continuation start: {started:?}");
            let ended = controller.on_generation_ended().await;
            println!("turn {turn} continuation end: {ended:?}");
        }
    }

    let summary = serde_json::json!({
        "state": controller.state().await,
        "active_profile": host.active_profile_name(),
        "switch_commands": host.switch_commands(),
        "continue_calls": host.continue_calls(),
        "settings": store.load(relay_core::SETTINGS_NAMESPACE),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    store.flush()?;
    Ok(())
}
