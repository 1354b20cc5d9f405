use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use testpilot::config::{CliOverrides, Config};
use testpilot::logging::{LogOptions, init_tracing};

mod cmd;

#[derive(Parser)]
#[command(name = "testpilot")]
#[command(version, about = "Drive an AI web-testing agent from the terminal")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Agent event-stream endpoint. Overrides testpilot.toml and TESTPILOT_WS_URL.
    #[arg(long, global = true)]
    pub ws_url: Option<String>,

    /// Verification report endpoint. Overrides testpilot.toml and TESTPILOT_REPORT_URL.
    #[arg(long, global = true)]
    pub report_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the agent and run an interactive testing session
    Session,
    /// Fetch the verification report once and print it
    Report {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that the agent is up
    Health,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and list any problems
    Validate,
    /// Initialize a default testpilot.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // Config commands inspect the file themselves, even when it is broken.
    if let Commands::Config { command } = &cli.command {
        return cmd::cmd_config(&project_dir, &cli, command.clone());
    }

    let config = Config::load(&project_dir, overrides(&cli)).context("Failed to load configuration")?;
    let log_dir = config.log_dir();
    let _guard = init_tracing(&LogOptions {
        filter: &config.toml.logging.filter,
        verbose: config.verbose,
        json: config.toml.logging.json,
        log_dir: config.toml.logging.file.then_some(log_dir.as_path()),
    });

    match &cli.command {
        Commands::Session => cmd::cmd_session(&config).await?,
        Commands::Report { json } => cmd::cmd_report(&config, *json).await?,
        Commands::Health => cmd::cmd_health(&config).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

pub(crate) fn overrides(cli: &Cli) -> CliOverrides {
    CliOverrides {
        ws_url: cli.ws_url.clone(),
        report_url: cli.report_url.clone(),
        verbose: cli.verbose,
    }
}
