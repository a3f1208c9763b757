//! Configuration loading for CLI commands.

use anyhow::{Context, Result};
use tracing::debug;
use wpdisco_core::Config;

use crate::cli::Cli;

/// Load the configuration selected by `--config`, or the default one.
///
/// # Errors
///
/// Returns an error if the configuration file exists but cannot be parsed.
pub fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration");
            Config::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        },
        None => Config::load().context("Failed to load config"),
    }
}
