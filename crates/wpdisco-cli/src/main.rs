//! wpdisco CLI - find the XML-RPC endpoint of a WordPress site
//!
//! This is the main entry point for the wpdisco command-line interface.
//! All command implementations are organized in separate modules.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;
mod output;
mod utils;

use cli::{Cli, Commands};
use utils::{initialize_logging, load_config};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let succeeded = execute_command(&cli).await?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn execute_command(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Discover(args) => {
            let config = load_config(cli)?;
            commands::discover(args, config).await
        },
        Commands::Normalize(args) => commands::normalize(args),
        Commands::RsdLink(args) => commands::rsd_link(args),
    }
}
