//! # Utility Functions and Helpers
//!
//! Shared utilities used across the CLI commands.
//!
//! - [`cli_args`]: Argument groups shared between subcommands
//! - [`logging`]: Tracing subscriber and color setup
//! - [`settings`]: Configuration loading

pub mod cli_args;
pub mod logging;
pub mod settings;

pub use logging::initialize_logging;
pub use settings::load_config;
