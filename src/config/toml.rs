//! TOML configuration file parsing

use super::Config;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    if let Some(ref url) = cli.broker_url {
        config.broker.url = url.clone();
    }
    if let Some(ref queue) = cli.task_queue {
        config.broker.task_queue = queue.clone();
    }
    if let Some(ref queue) = cli.result_queue {
        config.broker.result_queue = queue.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers.count = workers;
    }
    if let Some(ref dir) = cli.output_dir {
        config.output.directory = dir.clone();
    }
    if cli.debug {
        config.runtime.debug = true;
    }

    config
}
