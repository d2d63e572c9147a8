//! RegNote launcher
//!
//! Short-lived batch process: loads the config, takes the run lock and drives
//! one ingest, reconcile and notify pass. Meant to be invoked by a scheduler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regnote::Config;
use regnote_logging::{init_logging, LogConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;

mod cli;

use cli::contacts::ContactsAction;
use cli::error::HelpfulError;

#[derive(Parser, Debug)]
#[command(name = "regnote", version, about = "Lab result notifier")]
struct Cli {
    /// Path to the YAML config file
    #[arg(short = 'c', long, env = "REGNOTE_CONFIG", default_value = "config.yml", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan, extract, reconcile and notify (default)
    Run,

    /// Show ledger counters
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// List files still waiting for extraction
        #[arg(long)]
        pending: bool,
    },

    /// Manage client contact addresses
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(HelpfulError::config_not_found(path).into());
    }
    Config::load(path)
}

async fn run_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run => cli::run::run(config).await,
        Commands::Status { json, pending } => {
            cli::status::run(config, cli::status::StatusArgs { json, pending }).await
        }
        Commands::Contacts { action } => cli::contacts::run(config, action).await,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;

    let _log_guard = init_logging(LogConfig {
        app_name: "regnote",
        log_dir: &config.log_directory,
        verbose: cli.verbose,
    })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let command = cli.command.unwrap_or(Commands::Run);
    let result = runtime.block_on(run_command(command, &config));
    if let Err(err) = &result {
        error!("{:#}", err);
    }
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
