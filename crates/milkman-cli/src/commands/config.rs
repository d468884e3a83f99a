//! Config command handlers

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use milkman_core::Config;

use crate::output::{Output, OutputFormat};

/// Keys accepted by `config set`
const KEYS: &[&str] = &[
    "data_dir",
    "api_url",
    "sync_enabled",
    "filename",
    "poll_interval_secs",
    "retry_delay_ms",
    "load_retries",
    "low_stock_threshold",
    "log_file",
];

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_url": config.api_url,
                    "sync_enabled": config.sync_enabled,
                    "filename": config.filename,
                    "poll_interval_secs": config.poll_interval_secs,
                    "retry_delay_ms": config.retry_delay_ms,
                    "load_retries": config.load_retries,
                    "low_stock_threshold": config.low_stock_threshold,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:            {}", config.data_dir.display());
            println!("  api_url:             {}", config.api_url);
            println!("  sync_enabled:        {}", config.sync_enabled);
            println!("  filename:            {}", config.filename);
            println!("  poll_interval_secs:  {}", config.poll_interval_secs);
            println!("  retry_delay_ms:      {}", config.retry_delay_ms);
            println!("  load_retries:        {}", config.load_retries);
            println!("  low_stock_threshold: {}", config.low_stock_threshold);
            println!(
                "  log_file:            {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            if config.token_override.is_some() {
                println!();
                println!("Credential taken from MILKMAN_TOKEN.");
            }
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    set_in_file(&key, &value, &save_path)?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Update one key in the config file at `path`
fn set_in_file(key: &str, value: &str, path: &Path) -> Result<()> {
    let mut config = Config::load_from_path(path).context("Failed to load configuration")?;
    apply(&mut config, key, value)?;
    config
        .save_to_path(path)
        .context("Failed to save configuration")
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "api_url" => {
            if value.is_empty() {
                bail!("api_url cannot be empty");
            }
            config.api_url = value.to_string();
        }
        "sync_enabled" => {
            config.sync_enabled = value
                .parse()
                .context("Invalid value for sync_enabled. Use 'true' or 'false'.")?;
        }
        "filename" => {
            if value.is_empty() {
                bail!("filename cannot be empty");
            }
            config.filename = value.to_string();
        }
        "poll_interval_secs" => {
            config.poll_interval_secs = parse_number(key, value)?;
        }
        "retry_delay_ms" => {
            config.retry_delay_ms = parse_number(key, value)?;
        }
        "load_retries" => {
            config.load_retries = parse_number(key, value)?;
        }
        "low_stock_threshold" => {
            config.low_stock_threshold = parse_number(key, value)?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS.join(", ")
            );
        }
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value for {}: expected a non-negative number", key))
}
