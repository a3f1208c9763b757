//! Discover command implementation

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wpdisco_core::{Config, Discoverer};

use crate::cli::DiscoverArgs;
use crate::output::{DiscoveryReport, JsonFormatter, OutputFormat, TextFormatter};

/// Run discovery for `args.site`. Returns `true` if an endpoint was found.
///
/// Ctrl-C cancels the discovery in flight.
pub async fn execute(args: &DiscoverArgs, mut config: Config) -> Result<bool> {
    if let Some(user_agent) = &args.user_agent {
        config.http.user_agent.clone_from(user_agent);
    }
    if let Some(timeout) = args.timeout {
        config.http.timeout_secs = timeout;
    }
    if args.no_jetpack {
        config.jetpack.enabled = false;
    }

    let discoverer = Discoverer::new(&config)?;
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupted, cancelling discovery");
                cancel.cancel();
            }
        })
    };

    let result = discoverer
        .discover(&args.site, &config.http.user_agent, &cancel)
        .await;
    interrupt.abort();

    let report = DiscoveryReport::new(&args.site, &result);
    match args.format.resolve() {
        OutputFormat::Text => TextFormatter::print_discovery(&report),
        OutputFormat::Json => JsonFormatter::print(&report)?,
    }

    Ok(report.is_success())
}
