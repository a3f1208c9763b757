//! Capability probing of candidate XML-RPC endpoints.
//!
//! A candidate is a WordPress endpoint if `system.listMethods` answers with a
//! method list containing `wp.getUsersBlogs`. The probe returns the URL that
//! actually answered, which may differ from the candidate when the HTTP layer
//! followed redirects.
//!
//! ## Redirect Handling
//!
//! When a failed call ended on a different URL than requested, the probe looks
//! at what the server sent back:
//!
//! 1. **Mobile-plugin hijack** - the body carries a DudaMobile signature; the
//!    probe fails with [`Error::MobilePluginRedirected`]
//! 2. **Same host, 405 Method Not Allowed** - a load balancer moved the endpoint
//!    and the POST became a GET on the way; the probe retries at the new URL
//! 3. **Anything else** - the failure is returned unchanged
//!
//! Retries are bounded by [`REDIRECT_LIMIT`].

use super::run_cancellable;
use crate::xmlrpc::XmlRpcTransport;
use crate::{Error, Result, TransportError};
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

/// Maximum number of redirects followed, by the HTTP layer and by the probe.
pub const REDIRECT_LIMIT: usize = 16;

/// Method used to fingerprint an endpoint.
pub const LIST_METHODS: &str = "system.listMethods";

/// Method every WordPress XML-RPC endpoint exposes.
pub const GET_USERS_BLOGS: &str = "wp.getUsersBlogs";

/// Response body markers left by the DudaMobile plugin.
const MOBILE_PLUGIN_SIGNATURES: [&str; 2] = [
    "<meta name=\"GENERATOR\" content=\"www.dudamobile.com\">",
    "dm404Container",
];

/// HTTP status a redirected POST typically earns once it became a GET.
const METHOD_NOT_ALLOWED: u16 = 405;

type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Result<Url>> + Send + 'a>>;

/// Check whether `url` is a live WordPress XML-RPC endpoint.
///
/// Returns the canonical endpoint URL on success.
///
/// # Errors
///
/// - [`Error::NotWordPress`] if the endpoint does not list `wp.getUsersBlogs`
/// - [`Error::MobilePluginRedirected`] if a mobile plugin hijacked the request
/// - [`Error::TooManyRedirects`] after [`REDIRECT_LIMIT`] same-host retries
/// - [`Error::Invalid`] if the transport did not report the answering URL
/// - [`Error::Transport`] for any other network failure
/// - [`Error::Cancelled`] if `cancel` fires first
#[instrument(skip_all, fields(url = %url))]
pub async fn probe_endpoint(
    transport: &dyn XmlRpcTransport,
    url: &Url,
    cancel: &CancellationToken,
) -> Result<Url> {
    probe_recursive(transport, url.clone(), 0, cancel).await
}

/// Each hop owns its own counter; the chain is bounded by the recursion depth.
fn probe_recursive<'a>(
    transport: &'a dyn XmlRpcTransport,
    url: Url,
    redirect_count: usize,
    cancel: &'a CancellationToken,
) -> ProbeFuture<'a> {
    Box::pin(async move {
        if redirect_count >= REDIRECT_LIMIT {
            return Err(Error::TooManyRedirects {
                limit: REDIRECT_LIMIT,
            });
        }

        debug!(url = %url, redirect_count, "Probing XML-RPC endpoint");

        let outcome = run_cancellable(cancel, async {
            transport
                .call(&url, LIST_METHODS, &[])
                .await
                .map_err(Error::from)
        })
        .await;

        match outcome {
            Ok(response) => {
                let is_wordpress = response
                    .value
                    .as_string_list()
                    .is_some_and(|methods| methods.contains(&GET_USERS_BLOGS));
                if !is_wordpress {
                    return Err(Error::NotWordPress);
                }
                response.url.ok_or(Error::Invalid)
            },
            Err(Error::Transport(err)) => {
                if let Some(resolved) = err.url.as_ref().filter(|resolved| **resolved != url) {
                    if has_mobile_plugin_signature(&err) {
                        debug!(resolved = %resolved, "Redirected to a mobile plugin page");
                        return Err(Error::MobilePluginRedirected);
                    }

                    if resolved.host_str() == url.host_str()
                        && err.status == Some(METHOD_NOT_ALLOWED)
                    {
                        debug!(from = %url, to = %resolved, "Same-host redirect answered 405, retrying at new URL");
                        let next = resolved.clone();
                        return probe_recursive(transport, next, redirect_count + 1, cancel).await;
                    }
                }
                Err(Error::Transport(err))
            },
            Err(other) => Err(other),
        }
    })
}

fn has_mobile_plugin_signature(err: &TransportError) -> bool {
    err.body_text()
        .is_some_and(|body| MOBILE_PLUGIN_SIGNATURES.iter().any(|sig| body.contains(sig)))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::disallowed_macros,
    clippy::unnecessary_wraps
)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;
    use crate::test_support::{RecordingTransport, list_methods, wordpress_methods};
    use crate::xmlrpc::HttpXmlRpcTransport;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIST_METHODS_XML: &str = "<methodResponse><params><param><value><array><data>\
        <value><string>system.listMethods</string></value>\
        <value><string>wp.getUsersBlogs</string></value>\
        </data></array></value></param></params></methodResponse>";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_wordpress_endpoint_returns_resolved_url() {
        let transport = RecordingTransport::new(|_| {
            Ok(wordpress_methods("https://myblog.example/xmlrpc.php"))
        });

        let found = probe_endpoint(
            &transport,
            &url("http://myblog.example/xmlrpc.php"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(found.as_str(), "https://myblog.example/xmlrpc.php");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_blog_method_is_not_wordpress() {
        let transport = RecordingTransport::new(|endpoint| {
            Ok(list_methods(&["system.listMethods", "demo.sayHello"], endpoint.as_str()))
        });

        let err = probe_endpoint(
            &transport,
            &url("http://example.com/xmlrpc.php"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::NotWordPress));
    }

    #[tokio::test]
    async fn test_success_without_resolved_url_is_invalid() {
        let transport = RecordingTransport::new(|_| {
            let mut response = wordpress_methods("http://example.com/xmlrpc.php");
            response.url = None;
            Ok(response)
        });

        let err = probe_endpoint(
            &transport,
            &url("http://example.com/xmlrpc.php"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Invalid));
    }

    #[tokio::test]
    async fn test_same_host_405_retries_at_new_url() {
        let transport = RecordingTransport::new(|endpoint| {
            if endpoint.path() == "/xmlrpc.php" {
                Err(TransportError::new(TransportErrorKind::HttpStatus, "HTTP 405")
                    .with_url(Url::parse("http://example.com/blog/xmlrpc.php").unwrap())
                    .with_status(405))
            } else {
                Ok(wordpress_methods(endpoint.as_str()))
            }
        });

        let found = probe_endpoint(
            &transport,
            &url("http://example.com/xmlrpc.php"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(found.as_str(), "http://example.com/blog/xmlrpc.php");
        assert_eq!(
            transport.calls(),
            vec![
                "http://example.com/xmlrpc.php",
                "http://example.com/blog/xmlrpc.php"
            ]
        );
    }

    #[tokio::test]
    async fn test_redirect_chain_stops_at_limit() {
        let transport = RecordingTransport::new(|endpoint| {
            let hop: usize = endpoint
                .path()
                .trim_start_matches("/hop/")
                .parse()
                .unwrap_or(0);
            Err(TransportError::new(TransportErrorKind::HttpStatus, "HTTP 405")
                .with_url(Url::parse(&format!("http://example.com/hop/{}", hop + 1)).unwrap())
                .with_status(405))
        });

        let err = probe_endpoint(
            &transport,
            &url("http://example.com/hop/0"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::TooManyRedirects { limit: 16 }));
        assert_eq!(transport.call_count(), REDIRECT_LIMIT);
    }

    #[tokio::test]
    async fn test_cross_host_405_is_not_retried() {
        let transport = RecordingTransport::new(|_| {
            Err(TransportError::new(TransportErrorKind::HttpStatus, "HTTP 405")
                .with_url(Url::parse("http://other.example/xmlrpc.php").unwrap())
                .with_status(405))
        });

        let err = probe_endpoint(
            &transport,
            &url("http://example.com/xmlrpc.php"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportErrorKind::HttpStatus));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_same_host_other_status_is_not_retried() {
        let transport = RecordingTransport::new(|_| {
            Err(TransportError::new(TransportErrorKind::HttpStatus, "HTTP 404")
                .with_url(Url::parse("http://example.com/moved/xmlrpc.php").unwrap())
                .with_status(404))
        });

        let err = probe_endpoint(
            &transport,
            &url("http://example.com/xmlrpc.php"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportErrorKind::HttpStatus));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mobile_plugin_signatures() {
        for body in [
            "<html><head><meta name=\"GENERATOR\" content=\"www.dudamobile.com\"></head></html>",
            "<div class=\"dm404Container\">Not found</div>",
        ] {
            let transport = RecordingTransport::new(move |_| {
                Err(TransportError::new(TransportErrorKind::InvalidResponse, "not xml-rpc")
                    .with_url(Url::parse("http://m.example.com/").unwrap())
                    .with_status(200)
                    .with_body(body))
            });

            let err = probe_endpoint(
                &transport,
                &url("http://example.com/xmlrpc.php"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

            assert!(matches!(err, Error::MobilePluginRedirected), "body: {body}");
        }
    }

    #[tokio::test]
    async fn test_signature_without_redirect_is_ignored() {
        let transport = RecordingTransport::new(|endpoint| {
            Err(TransportError::new(TransportErrorKind::InvalidResponse, "not xml-rpc")
                .with_url(endpoint.clone())
                .with_body("<div class=\"dm404Container\"></div>"))
        });

        let err = probe_endpoint(
            &transport,
            &url("http://example.com/xmlrpc.php"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportErrorKind::InvalidResponse));
    }

    #[tokio::test]
    async fn test_cancelled_probe_makes_no_call() {
        let transport = RecordingTransport::new(|e| Ok(wordpress_methods(e.as_str())));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = probe_endpoint(&transport, &url("http://example.com/xmlrpc.php"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_http_redirect_405_is_followed_end_to_end() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xmlrpc.php"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "/blog/xmlrpc.php"),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/blog/xmlrpc.php"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/blog/xmlrpc.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LIST_METHODS_XML))
            .expect(1)
            .mount(&mock_server)
            .await;

        let start = url(&format!("{}/xmlrpc.php", mock_server.uri()));
        let found = probe_endpoint(
            &HttpXmlRpcTransport::default(),
            &start,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(found.path(), "/blog/xmlrpc.php");
    }

    #[tokio::test]
    async fn test_http_mobile_plugin_hijack() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xmlrpc.php"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/m/"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/m/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><meta name=\"GENERATOR\" content=\"www.dudamobile.com\"></head></html>",
            ))
            .mount(&mock_server)
            .await;

        let start = url(&format!("{}/xmlrpc.php", mock_server.uri()));
        let err = probe_endpoint(
            &HttpXmlRpcTransport::default(),
            &start,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::MobilePluginRedirected));
    }
}
