//! # CLI Structure and Argument Parsing
//!
//! The command-line interface for `wpdisco`, built with `clap` derive macros.
//!
//! ## Usage Patterns
//!
//! ```bash
//! # Find the XML-RPC endpoint of a site
//! wpdisco discover myblog.example
//!
//! # Machine-readable result, without the Jetpack check
//! wpdisco discover https://myblog.example/blog --format json --no-jetpack
//!
//! # Show the candidate URL the first probe would use
//! wpdisco normalize myblog.example
//!
//! # Extract the RSD link from a saved page
//! curl -s https://myblog.example | wpdisco rsd-link
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: the command succeeded
//! - `1`: discovery or normalization failed, or no RSD link was found
//! - `2`: invalid arguments

use clap::{Args, Parser, Subcommand};

use crate::utils::cli_args::FormatArg;
use std::path::PathBuf;

/// Main CLI structure for the `wpdisco` command
#[derive(Parser, Clone, Debug)]
#[command(name = "wpdisco")]
#[command(version)]
#[command(about = "wpdisco - find the XML-RPC endpoint of a WordPress site", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs, including every discovery stage
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Path to configuration file (overrides the default location). Also via `WPDISCO_CONFIG`.
    #[arg(long, global = true, value_name = "FILE", env = "WPDISCO_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands for the `wpdisco` CLI
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Discover and validate the XML-RPC endpoint of a site
    Discover(DiscoverArgs),

    /// Print the candidate endpoint URL for a site address
    Normalize(NormalizeArgs),

    /// Print the RSD link found in an HTML document
    #[command(name = "rsd-link")]
    RsdLink(RsdLinkArgs),
}

/// Arguments for `wpdisco discover`
#[derive(Args, Clone, Debug)]
pub struct DiscoverArgs {
    /// Site address, e.g. `myblog.example` or `https://myblog.example/blog`
    pub site: String,

    /// Client identification sent with every request
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip the Jetpack check after a failed discovery
    #[arg(long)]
    pub no_jetpack: bool,

    #[command(flatten)]
    pub format: FormatArg,
}

/// Arguments for `wpdisco normalize`
#[derive(Args, Clone, Debug)]
pub struct NormalizeArgs {
    /// Site address to normalize
    pub site: String,

    /// Do not append `/xmlrpc.php`
    #[arg(long)]
    pub raw: bool,

    #[command(flatten)]
    pub format: FormatArg,
}

/// Arguments for `wpdisco rsd-link`
#[derive(Args, Clone, Debug)]
pub struct RsdLinkArgs {
    /// HTML file to scan; reads stdin when omitted
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub format: FormatArg,
}
