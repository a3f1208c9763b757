//! Normalize command implementation

use anyhow::Result;
use wpdisco_core::normalize::normalize;

use crate::cli::NormalizeArgs;
use crate::output::{JsonFormatter, NormalizeReport, OutputFormat, TextFormatter};

/// Print the candidate URL for `args.site`. Returns `false` if the address is unusable.
pub fn execute(args: &NormalizeArgs) -> Result<bool> {
    let append_xmlrpc = !args.raw;
    let result = normalize(&args.site, append_xmlrpc);
    let report = NormalizeReport::new(&args.site, append_xmlrpc, &result);

    match args.format.resolve() {
        OutputFormat::Text => TextFormatter::print_normalized(&report),
        OutputFormat::Json => JsonFormatter::print(&report)?,
    }

    Ok(result.is_ok())
}
