//! Error types and handling for wpdisco-core operations.
//!
//! Every failure the discovery protocol can produce is a variant of the flat
//! [`Error`] enum. Network failures are wrapped in [`TransportError`], which keeps
//! the response context (resolved URL, HTTP status, raw body bytes) that the
//! probe needs to recognise redirects and hijacked responses.
//!
//! ## Error Categories
//!
//! - **Input errors**: empty, malformed, or non-HTTP site addresses
//! - **Validation errors**: the endpoint answered but is not WordPress, or a
//!   mobile plugin hijacked the request, or the redirect chain was too long
//! - **Transport errors**: DNS failures, dropped connections, authentication
//!   challenges, HTTP status errors, undecodable responses
//! - **Ambient errors**: configuration files and cancellation
//!
//! ## Terminal Errors
//!
//! Some failures make the remaining discovery fallbacks pointless. They are
//! reported by [`Error::is_terminal`]:
//!
//! ```rust
//! use wpdisco_core::{Error, TransportError, TransportErrorKind};
//!
//! let dns = Error::Transport(TransportError::new(
//!     TransportErrorKind::HostNotFound,
//!     "dns error: failed to lookup address",
//! ));
//! assert!(dns.is_terminal());
//! assert!(!Error::NotWordPress.is_terminal());
//! ```

use std::borrow::Cow;
use std::error::Error as StdError;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// The main error type for wpdisco-core operations.
///
/// Display strings are user-facing: they are what an application shows when a
/// site cannot be added.
#[derive(Error, Debug)]
pub enum Error {
    /// The site address was empty or whitespace only.
    #[error("Empty URL")]
    EmptyUrl,

    /// The site address could not be parsed as a URL.
    #[error("Invalid URL, please check if you wrote a valid site address: {0}")]
    InvalidUrl(String),

    /// The site address uses a scheme other than HTTP or HTTPS.
    #[error("Invalid URL scheme inserted, only HTTP and HTTPS are supported (got '{0}')")]
    InvalidScheme(String),

    /// The endpoint speaks XML-RPC but does not expose the WordPress API.
    #[error("That doesn't look like a WordPress site.")]
    NotWordPress,

    /// A hosting "mobile" plugin redirected the request to its own site.
    #[error(
        "You seem to have installed a mobile plugin from DudaMobile which is preventing the app to connect to your blog"
    )]
    MobilePluginRedirected,

    /// The endpoint kept moving after the redirect limit was reached.
    #[error("Too many redirects (limit: {limit})")]
    TooManyRedirects {
        /// The limit that was hit.
        limit: usize,
    },

    /// Catch-all for a site that does not look like a valid XML-RPC endpoint.
    #[error("That doesn't look like a WordPress site.")]
    Invalid,

    /// A network call failed. Carries the response context when there was one.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The discovery was cancelled by the caller.
    #[error("Discovery cancelled")]
    Cancelled,

    /// Content could not be parsed (RSD documents, XML-RPC responses).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this failure ends discovery without trying the fallbacks.
    ///
    /// Retrying through the raw URL or RSD discovery cannot recover from an
    /// unresolvable host, a dropped connection, an authentication challenge the
    /// user declined, or a mobile-plugin hijack.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::MobilePluginRedirected => true,
            Self::Transport(e) => matches!(
                e.kind,
                TransportErrorKind::HostNotFound
                    | TransportErrorKind::NetworkConnectionLost
                    | TransportErrorKind::UserCancelledAuth
            ),
            _ => false,
        }
    }

    /// The transport classification, if this is a network failure.
    #[must_use]
    pub const fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Get the error category as a stable string identifier.
    ///
    /// Used for structured logging and for the CLI's JSON output.
    ///
    /// ```rust
    /// use wpdisco_core::Error;
    ///
    /// assert_eq!(Error::EmptyUrl.category(), "empty_url");
    /// assert_eq!(Error::TooManyRedirects { limit: 16 }.category(), "too_many_redirects");
    /// ```
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::EmptyUrl => "empty_url",
            Self::InvalidUrl(_) => "invalid_url",
            Self::InvalidScheme(_) => "invalid_scheme",
            Self::NotWordPress => "not_wordpress",
            Self::MobilePluginRedirected => "mobile_plugin_redirected",
            Self::TooManyRedirects { .. } => "too_many_redirects",
            Self::Invalid => "invalid",
            Self::Transport(e) => e.kind.as_str(),
            Self::Cancelled => "cancelled",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
        }
    }
}

/// Classification of a failed network exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The host name could not be resolved.
    HostNotFound,
    /// The connection dropped in the middle of the exchange.
    NetworkConnectionLost,
    /// The server demanded HTTP authentication that was not supplied.
    UserCancelledAuth,
    /// The request timed out.
    TimedOut,
    /// The server answered with a non-success status.
    HttpStatus,
    /// The server answered 2xx, but the body is not an XML-RPC response.
    InvalidResponse,
    /// The server answered with an XML-RPC fault.
    Fault,
    /// Any other failure.
    Other,
}

impl TransportErrorKind {
    /// Stable snake_case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HostNotFound => "host_not_found",
            Self::NetworkConnectionLost => "network_connection_lost",
            Self::UserCancelledAuth => "user_cancelled_auth",
            Self::TimedOut => "timed_out",
            Self::HttpStatus => "http_status",
            Self::InvalidResponse => "invalid_response",
            Self::Fault => "fault",
            Self::Other => "transport",
        }
    }
}

/// A failed network exchange together with whatever the server sent back.
///
/// The probe inspects `url`, `status`, and `body` after a failure: a response
/// that ended on a different URL than requested means a redirect happened, and
/// the body may carry a hijack signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// What went wrong.
    pub kind: TransportErrorKind,
    /// Human-readable description.
    pub message: String,
    /// The final URL after any redirects the HTTP layer followed.
    pub url: Option<Url>,
    /// HTTP status of the final response, if one was received.
    pub status: Option<u16>,
    /// Raw response body, if one was received.
    pub body: Option<Vec<u8>>,
}

impl TransportError {
    /// Create an error with no response context.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            url: None,
            status: None,
            body: None,
        }
    }

    /// Attach the final resolved URL.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Attach the HTTP status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the response body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Response body decoded as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }

    /// Classify a `reqwest` failure that happened before a response was read.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = classify_reqwest(err);
        let mut error = Self::new(kind, error_chain_message(err));
        if let Some(url) = err.url() {
            error.url = Some(url.clone());
        }
        if let Some(status) = err.status() {
            error.status = Some(status.as_u16());
        }
        error
    }
}

const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "no such host",
    "name or service not known",
    "nodename nor servname",
];

const CONNECTION_LOST_MARKERS: &[&str] = &[
    "connection reset",
    "connection closed",
    "connection aborted",
    "broken pipe",
    "incomplete message",
    "unexpected eof",
];

fn classify_reqwest(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::TimedOut;
    }
    if let Some(status) = err.status() {
        return if status == reqwest::StatusCode::UNAUTHORIZED {
            TransportErrorKind::UserCancelledAuth
        } else {
            TransportErrorKind::HttpStatus
        };
    }

    let chain = error_chain_message(err).to_lowercase();
    if DNS_MARKERS.iter().any(|m| chain.contains(m)) {
        TransportErrorKind::HostNotFound
    } else if CONNECTION_LOST_MARKERS.iter().any(|m| chain.contains(m)) {
        TransportErrorKind::NetworkConnectionLost
    } else {
        TransportErrorKind::Other
    }
}

/// Join an error and all of its sources into one line.
fn error_chain_message(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// The failure half of a discovery result.
///
/// `has_jetpack` is only ever set on the final fallback path, when the site
/// could not be validated but the WordPress.com API reports Jetpack on it.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct DiscoveryError {
    /// Why discovery failed.
    #[source]
    pub error: Error,
    /// Whether the site runs Jetpack.
    pub has_jetpack: bool,
}

impl DiscoveryError {
    /// Wrap an error without the Jetpack hint.
    #[must_use]
    pub const fn new(error: Error) -> Self {
        Self {
            error,
            has_jetpack: false,
        }
    }
}

impl From<Error> for DiscoveryError {
    fn from(error: Error) -> Self {
        Self::new(error)
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::disallowed_macros,
    clippy::unwrap_used,
    clippy::unnecessary_wraps
)]
mod tests {
    use super::*;
    use std::io;

    fn transport(kind: TransportErrorKind) -> Error {
        Error::Transport(TransportError::new(kind, "boom"))
    }

    #[test]
    fn test_terminal_errors() {
        let terminal = vec![
            Error::MobilePluginRedirected,
            transport(TransportErrorKind::HostNotFound),
            transport(TransportErrorKind::NetworkConnectionLost),
            transport(TransportErrorKind::UserCancelledAuth),
        ];
        for error in terminal {
            assert!(error.is_terminal(), "Expected {error:?} to be terminal");
        }

        let fallthrough = vec![
            Error::NotWordPress,
            Error::Invalid,
            Error::TooManyRedirects { limit: 16 },
            transport(TransportErrorKind::TimedOut),
            transport(TransportErrorKind::HttpStatus),
            transport(TransportErrorKind::InvalidResponse),
            transport(TransportErrorKind::Fault),
            transport(TransportErrorKind::Other),
        ];
        for error in fallthrough {
            assert!(!error.is_terminal(), "Expected {error:?} to fall through");
        }
    }

    #[test]
    fn test_error_categories() {
        let cases = vec![
            (Error::EmptyUrl, "empty_url"),
            (Error::InvalidUrl("x".into()), "invalid_url"),
            (Error::InvalidScheme("ftp".into()), "invalid_scheme"),
            (Error::NotWordPress, "not_wordpress"),
            (Error::MobilePluginRedirected, "mobile_plugin_redirected"),
            (Error::TooManyRedirects { limit: 16 }, "too_many_redirects"),
            (Error::Invalid, "invalid"),
            (transport(TransportErrorKind::HostNotFound), "host_not_found"),
            (transport(TransportErrorKind::Other), "transport"),
            (Error::Cancelled, "cancelled"),
            (Error::Parse("x".into()), "parse"),
            (Error::Config("x".into()), "config"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.category(), expected);
        }
    }

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(Error::EmptyUrl.to_string(), "Empty URL");
        assert_eq!(
            Error::NotWordPress.to_string(),
            "That doesn't look like a WordPress site."
        );
        assert_eq!(Error::Invalid.to_string(), Error::NotWordPress.to_string());
        assert!(Error::MobilePluginRedirected.to_string().contains("DudaMobile"));
        assert!(
            Error::InvalidScheme("ftp".into())
                .to_string()
                .contains("only HTTP and HTTPS")
        );
    }

    #[test]
    fn test_transport_error_keeps_context() {
        let url = Url::parse("https://example.com/xmlrpc.php").unwrap();
        let error = TransportError::new(TransportErrorKind::HttpStatus, "HTTP 405")
            .with_url(url.clone())
            .with_status(405)
            .with_body("<html>nope</html>");

        assert_eq!(error.url, Some(url));
        assert_eq!(error.status, Some(405));
        assert_eq!(error.body_text().unwrap(), "<html>nope</html>");

        let wrapped: Error = error.into();
        assert_eq!(wrapped.transport_kind(), Some(TransportErrorKind::HttpStatus));
        assert_eq!(wrapped.to_string(), "HTTP 405");
    }

    #[test]
    fn test_discovery_error_display_delegates() {
        let error = DiscoveryError {
            error: Error::Invalid,
            has_jetpack: true,
        };
        assert_eq!(error.to_string(), "That doesn't look like a WordPress site.");
        assert!(StdError::source(&error).is_some());

        let plain: DiscoveryError = Error::EmptyUrl.into();
        assert!(!plain.has_jetpack);
    }

    #[test]
    fn test_error_chain_message_includes_sources() {
        let inner = io::Error::other("connection reset by peer");
        let outer = io::Error::new(io::ErrorKind::ConnectionReset, inner);
        let message = error_chain_message(&outer);
        assert!(message.contains("connection reset by peer"));
    }
}
