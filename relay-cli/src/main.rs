use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod error;
mod settings;
mod simulate;

use relay_cycle::OperatorCommand;
use settings::{SettingsAction, run_settings_command};
use simulate::{SimulateOptions, run_simulation};

#[derive(Parser, Debug)]
#[command(name = "relay", version = "0.1.0")]
#[command(about = "Reasoning relay - swap to a reasoning profile for each generation")]
struct Cli {
    /// Settings file shared with the host
    #[arg(long, global = true, default_value = "relay-settings.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run generation cycles against a simulated host
    Simulate(SimulateOptions),
    /// Inspect or edit relay settings
    Config {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List operator commands
    #[command(name = "commands")]
    ListCommands,
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .try_init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate(options) => run_simulation(&cli.settings, options).await,
        Commands::Config { action } => run_settings_command(&cli.settings, action),
        Commands::ListCommands => {
            for command in OperatorCommand::ALL {
                println!("{:<24} {}", command.to_string(), command.help());
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}
