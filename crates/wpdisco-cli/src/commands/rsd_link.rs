//! RSD link extraction command implementation

use anyhow::{Context, Result};
use std::io::Read;
use wpdisco_core::discovery::extract_rsd_link;

use crate::cli::RsdLinkArgs;
use crate::output::{JsonFormatter, OutputFormat, RsdLinkReport, TextFormatter};

/// Print the RSD link of an HTML document. Returns `false` if there is none.
pub fn execute(args: &RsdLinkArgs) -> Result<bool> {
    let (source, html) = match &args.file {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            (path.display().to_string(), html)
        },
        None => {
            let mut html = String::new();
            std::io::stdin()
                .read_to_string(&mut html)
                .context("Failed to read stdin")?;
            ("-".to_string(), html)
        },
    };

    let report = RsdLinkReport {
        source,
        link: extract_rsd_link(&html),
    };

    match args.format.resolve() {
        OutputFormat::Text => TextFormatter::print_rsd_link(&report),
        OutputFormat::Json => JsonFormatter::print(&report)?,
    }

    Ok(report.link.is_some())
}
