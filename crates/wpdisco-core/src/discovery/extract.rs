//! RSD link extraction from HTML.
//!
//! WordPress advertises its Really Simple Discovery document in the `<head>` of
//! every page:
//!
//! ```html
//! <link rel="EditURI" type="application/rsd+xml" title="RSD" href="https://example.com/xmlrpc.php?rsd" />
//! ```
//!
//! This is a narrow regex heuristic, not an HTML parser. The attributes must
//! appear in the order WordPress emits them; matching is case-insensitive.
//!
//! ```rust
//! use wpdisco_core::discovery::extract_rsd_link;
//!
//! let html = r#"<head><link rel="EditURI" type="application/rsd+xml" title="RSD" href="http://x.com/xmlrpc.php?rsd" /></head>"#;
//! assert_eq!(extract_rsd_link(html).as_deref(), Some("http://x.com/xmlrpc.php?rsd"));
//! assert_eq!(extract_rsd_link("<html></html>"), None);
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Regex for the `EditURI` discovery link.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static RSD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<link\s+rel="EditURI"\s+type="application/rsd\+xml"\s+title="RSD"\s+href="([^"]*)"[^>]*>"#,
    )
    .unwrap()
});

/// Return the `href` of the first RSD discovery link in `html`, verbatim.
///
/// Returns `None` when there is no such link or its `href` is empty.
#[must_use]
pub fn extract_rsd_link(html: &str) -> Option<String> {
    let href = RSD_LINK_RE.captures(html)?.get(1)?.as_str();
    if href.is_empty() {
        return None;
    }
    Some(href.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_self_closing_link() {
        let html = r#"<!DOCTYPE html>
<html><head>
<link rel="EditURI" type="application/rsd+xml" title="RSD" href="https://blog.example/xmlrpc.php?rsd" />
<link rel="wlwmanifest" type="application/wlwmanifest+xml" href="https://blog.example/wp-includes/wlwmanifest.xml" />
</head></html>"#;

        assert_eq!(
            extract_rsd_link(html).as_deref(),
            Some("https://blog.example/xmlrpc.php?rsd")
        );
    }

    #[test]
    fn test_extracts_unclosed_link() {
        let html = r#"<link rel="EditURI" type="application/rsd+xml" title="RSD" href="http://x.com/xmlrpc.php?rsd">"#;
        assert_eq!(
            extract_rsd_link(html).as_deref(),
            Some("http://x.com/xmlrpc.php?rsd")
        );
    }

    #[test]
    fn test_is_case_insensitive() {
        let html = r#"<LINK REL="edituri" TYPE="APPLICATION/RSD+XML" TITLE="rsd" HREF="http://x.com/rsd.xml"/>"#;
        assert_eq!(extract_rsd_link(html).as_deref(), Some("http://x.com/rsd.xml"));
    }

    #[test]
    fn test_first_match_wins() {
        let html = r#"
<link rel="EditURI" type="application/rsd+xml" title="RSD" href="http://first.example/xmlrpc.php?rsd" />
<link rel="EditURI" type="application/rsd+xml" title="RSD" href="http://second.example/xmlrpc.php?rsd" />"#;
        assert_eq!(
            extract_rsd_link(html).as_deref(),
            Some("http://first.example/xmlrpc.php?rsd")
        );
    }

    #[test]
    fn test_href_is_not_unescaped() {
        let html = r#"<link rel="EditURI" type="application/rsd+xml" title="RSD" href="http://x.com/?a=1&amp;rsd" />"#;
        assert_eq!(
            extract_rsd_link(html).as_deref(),
            Some("http://x.com/?a=1&amp;rsd")
        );
    }

    #[test]
    fn test_missing_or_malformed_link() {
        assert_eq!(extract_rsd_link(""), None);
        assert_eq!(extract_rsd_link("<html><head></head></html>"), None);
        // Attributes in a different order are not recognised
        assert_eq!(
            extract_rsd_link(
                r#"<link href="http://x.com/xmlrpc.php?rsd" rel="EditURI" type="application/rsd+xml" title="RSD" />"#
            ),
            None
        );
        // Unquoted href
        assert_eq!(
            extract_rsd_link(
                r#"<link rel="EditURI" type="application/rsd+xml" title="RSD" href=http://x.com />"#
            ),
            None
        );
        assert_eq!(
            extract_rsd_link(r#"<link rel="EditURI" type="application/rsd+xml" title="RSD" href="" />"#),
            None
        );
    }
}
