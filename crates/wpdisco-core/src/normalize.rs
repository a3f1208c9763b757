//! Site address normalization.
//!
//! Turns a user-typed site address into candidate XML-RPC endpoint URLs. Two
//! candidates are derived from one input:
//!
//! - the **augmented** form, with `/xmlrpc.php` appended unless the address
//!   already ends in it
//! - the **raw** form, the address as typed with only the scheme filled in
//!
//! ```rust
//! use wpdisco_core::normalize::normalize;
//!
//! let augmented = normalize("  example.com\n", true)?;
//! assert_eq!(augmented.as_str(), "http://example.com/xmlrpc.php");
//!
//! let raw = normalize("example.com", false)?;
//! assert_eq!(raw.as_str(), "http://example.com");
//! # Ok::<(), wpdisco_core::Error>(())
//! ```

use crate::{Error, Result};
use std::fmt;
use url::Url;

/// File name of the WordPress XML-RPC endpoint.
pub const XMLRPC_FILENAME: &str = "xmlrpc.php";

/// A validated absolute `http`/`https` URL derived from user input.
///
/// Keeps the text exactly as it was assembled (`http://example.com` stays
/// without a trailing slash) next to the parsed [`Url`] used for requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    text: String,
    url: Url,
}

impl CandidateUrl {
    /// The candidate as assembled from the input.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The parsed URL.
    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.url
    }

    /// Consume the candidate, returning the parsed URL.
    #[must_use]
    pub fn into_url(self) -> Url {
        self.url
    }
}

impl fmt::Display for CandidateUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Both candidates for one site address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    /// Address with `/xmlrpc.php` appended.
    pub augmented: CandidateUrl,
    /// Address as typed, scheme-normalized.
    pub raw: CandidateUrl,
}

impl Candidates {
    /// Derive both candidates. Fails if either cannot be built.
    pub fn from_input(input: &str) -> Result<Self> {
        Ok(Self {
            augmented: normalize(input, true)?,
            raw: normalize(input, false)?,
        })
    }
}

/// Normalize a site address into a candidate URL.
///
/// # Errors
///
/// - [`Error::EmptyUrl`] if the input is empty after trimming whitespace
/// - [`Error::InvalidUrl`] if it cannot be parsed as a URL
/// - [`Error::InvalidScheme`] if the scheme is neither `http` nor `https`
/// - [`Error::Invalid`] if appending `/xmlrpc.php` produced an unparseable URL
pub fn normalize(input: &str, append_xmlrpc: bool) -> Result<CandidateUrl> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyUrl);
    }

    let mut text = if explicit_scheme(trimmed).is_some() {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let base = Url::parse(&text).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;

    let scheme = base.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::InvalidScheme(scheme.to_string()));
    }

    if !append_xmlrpc || last_path_segment(&base) == Some(XMLRPC_FILENAME) {
        return Ok(CandidateUrl { text, url: base });
    }

    tracing::debug!(site = %trimmed, "Assuming the address is the home page and XML-RPC sits at /{XMLRPC_FILENAME}");
    text.push('/');
    text.push_str(XMLRPC_FILENAME);

    let url = Url::parse(&text).map_err(|_| Error::Invalid)?;
    Ok(CandidateUrl { text, url })
}

/// The scheme the user typed, if any.
///
/// `host:port` input such as `localhost:8080` has no scheme: the part after the
/// colon starts with a digit and there is no `//` authority marker.
fn explicit_scheme(input: &str) -> Option<&str> {
    let (scheme, rest) = input.split_once(':')?;

    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return None;
    }

    if rest.starts_with("//") {
        return Some(scheme);
    }
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(scheme)
}

/// Last non-empty path segment, so `/blog/xmlrpc.php/` still reports `xmlrpc.php`.
fn last_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.rfind(|s| !s.is_empty())
}
