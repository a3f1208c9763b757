//! # Output Formatting
//!
//! Results are printed either as human-readable text or as a single pretty
//! JSON object:
//!
//! ```bash
//! wpdisco discover myblog.example --format text
//! wpdisco discover myblog.example --format json | jq -r .endpoint
//! ```
//!
//! Both formats render the same report types, so scripts and humans see the
//! same facts.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use serde::Serialize;
use url::Url;
use wpdisco_core::{CandidateUrl, DiscoveryError, Error};

/// Output format options supported by the CLI
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty text output (default on a terminal)
    Text,
    /// Single JSON object (default when piped)
    Json,
}

/// How a command ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Found,
    Failed,
}

/// Error details shared by all reports.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorReport {
    /// Stable identifier, see `wpdisco_core::Error::category`
    pub category: &'static str,
    pub message: String,
}

impl From<&Error> for ErrorReport {
    fn from(error: &Error) -> Self {
        Self {
            category: error.category(),
            message: error.to_string(),
        }
    }
}

/// Result of `wpdisco discover`.
#[derive(Clone, Debug, Serialize)]
pub struct DiscoveryReport {
    pub input: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    pub has_jetpack: bool,
}

impl DiscoveryReport {
    pub fn new(input: &str, result: &Result<Url, DiscoveryError>) -> Self {
        match result {
            Ok(endpoint) => Self {
                input: input.to_string(),
                outcome: Outcome::Found,
                endpoint: Some(endpoint.to_string()),
                error: None,
                has_jetpack: false,
            },
            Err(failure) => Self {
                input: input.to_string(),
                outcome: Outcome::Failed,
                endpoint: None,
                error: Some(ErrorReport::from(&failure.error)),
                has_jetpack: failure.has_jetpack,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Found
    }
}

/// Result of `wpdisco normalize`.
#[derive(Clone, Debug, Serialize)]
pub struct NormalizeReport {
    pub input: String,
    pub append_xmlrpc: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl NormalizeReport {
    pub fn new(input: &str, append_xmlrpc: bool, result: &wpdisco_core::Result<CandidateUrl>) -> Self {
        let (url, error) = match result {
            Ok(candidate) => (Some(candidate.as_str().to_string()), None),
            Err(e) => (None, Some(ErrorReport::from(e))),
        };
        Self {
            input: input.to_string(),
            append_xmlrpc,
            url,
            error,
        }
    }
}

/// Result of `wpdisco rsd-link`.
#[derive(Clone, Debug, Serialize)]
pub struct RsdLinkReport {
    /// File name, or `-` for stdin
    pub source: String,
    pub link: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wpdisco_core::{TransportError, TransportErrorKind};

    #[test]
    fn test_success_report_json() {
        let endpoint = Url::parse("https://myblog.example/xmlrpc.php").unwrap();
        let report = DiscoveryReport::new("myblog.example", &Ok(endpoint));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "found");
        assert_eq!(json["endpoint"], "https://myblog.example/xmlrpc.php");
        assert_eq!(json["has_jetpack"], false);
        assert!(json.get("error").is_none());
        assert!(report.is_success());
    }

    #[test]
    fn test_failure_report_json() {
        let failure = DiscoveryError {
            error: Error::Transport(TransportError::new(
                TransportErrorKind::HostNotFound,
                "dns error: failed to lookup address information",
            )),
            has_jetpack: true,
        };
        let report = DiscoveryReport::new("nope.example", &Err(failure));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["error"]["category"], "host_not_found");
        assert_eq!(json["has_jetpack"], true);
        assert!(json.get("endpoint").is_none());
        assert!(!report.is_success());
    }

    #[test]
    fn test_normalize_report() {
        let report = NormalizeReport::new(
            "example.com",
            true,
            &wpdisco_core::normalize::normalize("example.com", true),
        );
        assert_eq!(report.url.as_deref(), Some("http://example.com/xmlrpc.php"));

        let report = NormalizeReport::new("", true, &wpdisco_core::normalize::normalize("", true));
        assert_eq!(report.error.unwrap().category, "empty_url");
    }
}
