//! HeadPut CLI: hands-free keyboard and mouse control from facial gestures.
//!
//! Usage:
//!   headput run [OPTIONS]              Listen for samples and actuate
//!   headput replay <SAMPLES>           Replay a recorded sample stream
//!   headput settings show|reset|set    Inspect or edit rule settings
//!   headput check                      Validate the rule settings file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use headput_common::config::AppConfig;
use headput_common::logging::{init_logging, with_verbosity};

mod commands;

#[derive(Parser)]
#[command(
    name = "headput",
    about = "Hands-free keyboard and mouse control from facial gestures",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/headput/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rule settings file, overriding the config
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for capture samples and drive the keyboard and mouse
    Run {
        /// Listen address, overriding the config
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Feed a recorded sample stream through the engine on a simulated clock
    Replay {
        /// File of DATA:/IMAGE: framed or plain JSON samples
        samples: PathBuf,

        /// Write the resulting commands as JSONL instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Simulated time between samples (milliseconds)
        #[arg(long, default_value = "50")]
        frame_ms: u64,
    },

    /// Inspect or edit rule settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Validate the rule settings file
    Check,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print every rule
    Show {
        /// Print the raw JSON mapping
        #[arg(long)]
        json: bool,
    },

    /// Replace all rules with the defaults
    Reset,

    /// Change one field of one rule
    Set {
        /// Rule name, e.g. MouthOpen
        rule: String,

        /// Field name, e.g. Threshold or Key
        field: String,

        /// New value
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if let Some(settings) = cli.settings {
        config.settings_path = settings;
    }

    init_logging(&with_verbosity(&config.logging, cli.verbose));

    match cli.command {
        Commands::Run { bind } => {
            if let Some(bind) = bind {
                config.listener.bind_addr = bind;
            }
            commands::run::run(config).await
        }
        Commands::Replay {
            samples,
            output,
            frame_ms,
        } => commands::replay::run(&config, samples, output, frame_ms),
        Commands::Settings { action } => commands::settings::run(&config, action),
        Commands::Check => commands::check::run(&config),
    }
}
