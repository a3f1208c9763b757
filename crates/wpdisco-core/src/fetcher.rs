use crate::config::HttpConfig;
use crate::discovery::probe::REDIRECT_LIMIT;
use crate::error::{TransportError, TransportErrorKind};
use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info};
use url::Url;

/// Fetches documents (home pages, RSD files) as text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the body.
    async fn fetch_text(&self, url: &Url) -> Result<String, TransportError>;
}

/// HTTP page fetcher with a fresh client per request.
///
/// Non-success statuses still return the body: a WordPress 404 page carries the
/// same discovery links as the home page.
#[derive(Debug, Clone, Default)]
pub struct HttpPageFetcher {
    config: HttpConfig,
}

impl HttpPageFetcher {
    /// Create a fetcher using the given HTTP settings.
    #[must_use]
    pub const fn new(config: HttpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, TransportError> {
        let client = build_client(&self.config)?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let final_url = response.url().clone();
        let status = response.status();
        if !status.is_success() {
            debug!(url = %final_url, status = %status, "Page fetch returned non-success status");
        }

        let bytes = read_body(response, self.config.max_body_bytes).await?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        info!("Fetched {} bytes from {}", content.len(), final_url);
        Ok(content)
    }
}

/// Read a response body, failing once it grows past `limit` bytes.
pub(crate) async fn read_body(mut response: Response, limit: usize) -> Result<Vec<u8>, TransportError> {
    let url = response.url().clone();
    let status = response.status().as_u16();
    let too_large = |url: Url| {
        TransportError::new(
            TransportErrorKind::InvalidResponse,
            format!("Response body from {url} exceeds {limit} bytes"),
        )
        .with_url(url)
        .with_status(status)
    };

    if response
        .content_length()
        .is_some_and(|len| usize::try_from(len).map_or(true, |len| len > limit))
    {
        return Err(too_large(url));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        TransportError::from_reqwest(&e)
            .with_url(url.clone())
            .with_status(status)
    })? {
        if body.len() + chunk.len() > limit {
            debug!(url = %url, limit, "Response body over limit");
            return Err(too_large(url));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Build an ephemeral HTTP client: no cookie store, no pooled state shared
/// between calls.
pub(crate) fn build_client(config: &HttpConfig) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .gzip(true)
        .brotli(true)
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::limited(REDIRECT_LIMIT))
        .build()
        .map_err(|e| {
            TransportError::new(
                TransportErrorKind::Other,
                format!("Failed to build HTTP client: {e}"),
            )
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        assert!(build_client(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_sends_user_agent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("user-agent", "wpdisco-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
            .mount(&mock_server)
            .await;

        let fetcher = HttpPageFetcher::new(HttpConfig {
            user_agent: "wpdisco-test/1.0".to_string(),
            ..HttpConfig::default()
        });
        let url = Url::parse(&mock_server.uri()).unwrap();

        assert_eq!(fetcher.fetch_text(&url).await.unwrap(), "<html>hello</html>");
    }

    #[tokio::test]
    async fn test_fetch_keeps_body_of_404_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();
        let body = HttpPageFetcher::default().fetch_text(&url).await.unwrap();

        assert_eq!(body, "not here");
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("slow")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpPageFetcher::new(HttpConfig {
            timeout_secs: 1,
            ..HttpConfig::default()
        });
        let url = Url::parse(&format!("{}/slow", mock_server.uri())).unwrap();
        let err = fetcher.fetch_text(&url).await.unwrap_err();

        assert_eq!(err.kind, TransportErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&mock_server)
            .await;

        let fetcher = HttpPageFetcher::new(HttpConfig {
            max_body_bytes: 1024,
            ..HttpConfig::default()
        });
        let url = Url::parse(&format!("{}/huge", mock_server.uri())).unwrap();
        let err = fetcher.fetch_text(&url).await.unwrap_err();

        assert_eq!(err.kind, TransportErrorKind::InvalidResponse);
        assert_eq!(err.status, Some(200));
        assert!(err.message.contains("exceeds 1024 bytes"));
    }

    #[tokio::test]
    async fn test_fetch_accepts_body_at_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(1024)))
            .mount(&mock_server)
            .await;

        let fetcher = HttpPageFetcher::new(HttpConfig {
            max_body_bytes: 1024,
            ..HttpConfig::default()
        });
        let url = Url::parse(&mock_server.uri()).unwrap();

        assert_eq!(fetcher.fetch_text(&url).await.unwrap().len(), 1024);
    }
}
