//! Milkman CLI
//!
//! Command-line interface for Milkman - track milk in stock across devices.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use milkman_core::{Config, FileStore};

mod commands;
mod output;
mod session;

use output::{Output, OutputFormat, OutputReporter};

#[derive(Parser)]
#[command(name = "milkman")]
#[command(about = "Milkman - keep track of the milk in your fridge")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show stock, recent history and sync state (default)
    Status,
    /// Add units to stock
    Add {
        /// Number of units
        #[arg(default_value_t = 1)]
        amount: u32,
    },
    /// Consume units from stock
    Drink {
        /// Number of units
        #[arg(default_value_t = 1)]
        amount: u32,
    },
    /// Revert the most recent add or drink
    Undo,
    /// Show history, newest first
    #[command(alias = "log")]
    History {
        /// Show all kept records, not just the last few
        #[arg(short, long)]
        all: bool,
    },
    /// Push the current data to the remote document now
    Sync,
    /// Watch for changes from other devices until Ctrl-C
    Watch,
    /// Store the access token for the remote document store
    Login {
        /// Personal access token (gist scope)
        token: String,
    },
    /// Remove the stored access token
    Logout,
    /// Use an existing remote document (e.g. one created on another device)
    Link {
        /// Remote document ID
        id: String,
    },
    /// Forget the remote document
    Unlink,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, sync_enabled, low_stock_threshold, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_flags(cli.json, cli.quiet);

    // Config commands work on the file itself
    if let Some(Commands::Config { command }) = &cli.command {
        let output = Output::new(format, 0);
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())?;
    init_logging(&config);
    let output = Output::new(format, config.low_stock_threshold);

    let command = cli.command.unwrap_or(Commands::Status);

    // Commands that only touch the local store
    match command {
        Commands::Login { token } => {
            let store = FileStore::new(&config.data_dir);
            return commands::auth::login(&store, token, &output);
        }
        Commands::Logout => {
            let store = FileStore::new(&config.data_dir);
            return commands::auth::logout(&store, &output);
        }
        Commands::Watch => return commands::watch::watch(&config, &output).await,
        _ => {}
    }

    let reporter = OutputReporter::new(format, session::has_credential(&config));
    let engine = session::open(&config, Arc::new(reporter))?;
    engine.bootstrap().await;

    match command {
        Commands::Status => commands::stock::status(&engine, &output).await,
        Commands::Add { amount } => commands::stock::add(&engine, amount, &output).await,
        Commands::Drink { amount } => commands::stock::drink(&engine, amount, &output).await,
        Commands::Undo => commands::stock::undo(&engine, &output).await,
        Commands::History { all } => commands::stock::history(&engine, all, &output).await,
        Commands::Sync => commands::sync::sync(&engine, &output).await,
        Commands::Link { id } => commands::sync::link(&engine, id, &output).await,
        Commands::Unlink => commands::sync::unlink(&engine, &output).await,
        Commands::Login { .. } | Commands::Logout | Commands::Watch => unreachable!(), // Handled above
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize file-based logging when MILKMAN_LOG is set
///
/// Logs go to a file so they never interleave with command output.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("MILKMAN_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "milkman_core={},milkman_cli={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
