//! Text output formatting

use colored::Colorize;

use super::{DiscoveryReport, ErrorReport, NormalizeReport, RsdLinkReport};

pub struct TextFormatter;

impl TextFormatter {
    pub fn print_discovery(report: &DiscoveryReport) {
        if let Some(endpoint) = &report.endpoint {
            println!("{} {}", "XML-RPC endpoint:".green().bold(), endpoint);
            return;
        }

        if let Some(error) = &report.error {
            print_error(&format!("Discovery failed for {}", report.input), error);
        }
        if report.has_jetpack {
            println!(
                "{} this site runs Jetpack; you can connect it with a WordPress.com account instead",
                "hint:".yellow().bold()
            );
        }
    }

    pub fn print_normalized(report: &NormalizeReport) {
        match (&report.url, &report.error) {
            (Some(url), _) => println!("{url}"),
            (None, Some(error)) => print_error(&format!("Cannot use {:?}", report.input), error),
            (None, None) => {},
        }
    }

    pub fn print_rsd_link(report: &RsdLinkReport) {
        match &report.link {
            Some(link) => println!("{link}"),
            None => println!("{} no RSD link in {}", "none:".yellow().bold(), report.source),
        }
    }
}

fn print_error(context: &str, error: &ErrorReport) {
    println!("{} {context}", "error:".red().bold());
    println!("  {} ({})", error.message, error.category.dimmed());
}
