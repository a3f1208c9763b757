//! Jetpack detection through the WordPress.com public API.
//!
//! Only consulted after discovery has already failed: a site that runs Jetpack
//! but has no reachable XML-RPC endpoint gets a more helpful error message.

use crate::config::Config;
use crate::error::TransportError;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Path of the site-info endpoint, relative to the API base.
const SITE_INFO_PATH: &str = "rest/v1.1/connect/site-info";

/// Default timeout for the Jetpack check.
const JETPACK_TIMEOUT: Duration = Duration::from_secs(15);

/// Asks whether a site runs Jetpack.
#[async_trait]
pub trait JetpackProbe: Send + Sync {
    /// `user_agent` identifies the calling application to the API.
    ///
    /// `site` is passed to the API exactly as given.
    async fn has_jetpack(&self, site: &str, user_agent: &str) -> Result<bool>;
}

/// [`JetpackProbe`] backed by `GET {api_base}/rest/v1.1/connect/site-info?url=<site>`.
#[derive(Debug, Clone)]
pub struct WpComJetpackProbe {
    api_base: Url,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SiteInfo {
    #[serde(rename = "hasJetpack", default)]
    has_jetpack: bool,
}

impl WpComJetpackProbe {
    /// Create a probe against the given API base.
    #[must_use]
    pub const fn new(api_base: Url) -> Self {
        Self {
            api_base,
            timeout: JETPACK_TIMEOUT,
        }
    }

    /// Create a probe from configuration.
    ///
    /// The request timeout follows `[http] timeout_secs`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let jetpack = &config.jetpack;
        let api_base = Url::parse(&jetpack.api_base)
            .map_err(|e| Error::Config(format!("Invalid jetpack.api_base '{}': {e}", jetpack.api_base)))?;
        Ok(Self::new(api_base).with_timeout(config.http.timeout()))
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn site_info_url(&self, site: &str) -> Result<Url> {
        let mut base = self.api_base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut url = base
            .join(SITE_INFO_PATH)
            .map_err(|e| Error::Config(format!("Invalid Jetpack API URL: {e}")))?;
        url.query_pairs_mut().append_pair("url", site);
        Ok(url)
    }
}

#[async_trait]
impl JetpackProbe for WpComJetpackProbe {
    #[instrument(skip_all, fields(site = %site))]
    async fn has_jetpack(&self, site: &str, user_agent: &str) -> Result<bool> {
        let url = self.site_info_url(site)?;
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let response = client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let info: SiteInfo = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Unexpected site-info response: {e}")))?;

        debug!(has_jetpack = info.has_jetpack, "Jetpack check finished");
        Ok(info.has_jetpack)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn probe_for(server: &MockServer) -> WpComJetpackProbe {
        WpComJetpackProbe::new(Url::parse(&server.uri()).unwrap())
    }

    #[test]
    fn test_site_info_url() {
        let probe = WpComJetpackProbe::new(Url::parse("https://public-api.wordpress.com").unwrap());

        let url = probe.site_info_url("http://myblog.example").unwrap();
        assert_eq!(
            url.as_str(),
            "https://public-api.wordpress.com/rest/v1.1/connect/site-info?url=http%3A%2F%2Fmyblog.example"
        );
    }

    #[test]
    fn test_site_info_url_keeps_base_path() {
        let probe = WpComJetpackProbe::new(Url::parse("http://localhost:9000/api").unwrap());
        let url = probe.site_info_url("http://x.example").unwrap();
        assert_eq!(url.path(), "/api/rest/v1.1/connect/site-info");
    }

    #[test]
    fn test_from_config_rejects_bad_base() {
        let mut config = Config::default();
        config.jetpack.api_base = "not a url".to_string();
        assert!(matches!(
            WpComJetpackProbe::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config_uses_http_timeout() {
        let mut config = Config::default();
        config.http.timeout_secs = 7;

        let probe = WpComJetpackProbe::from_config(&config).unwrap();
        assert_eq!(probe.timeout, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_reports_jetpack() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1.1/connect/site-info"))
            .and(query_param("url", "http://myblog.example"))
            .and(header("user-agent", "MyApp/1.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "hasJetpack": true, "isWordPress": true })),
            )
            .mount(&mock_server)
            .await;

        let has_jetpack = probe_for(&mock_server)
            .has_jetpack("http://myblog.example", "MyApp/1.0")
            .await
            .unwrap();

        assert!(has_jetpack);
    }

    #[tokio::test]
    async fn test_missing_field_means_no_jetpack() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1.1/connect/site-info"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "isWordPress": true })),
            )
            .mount(&mock_server)
            .await;

        assert!(
            !probe_for(&mock_server)
                .has_jetpack("http://myblog.example", "ua")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1.1/connect/site-info"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let err = probe_for(&mock_server)
            .has_jetpack("http://myblog.example", "ua")
            .await
            .unwrap_err();

        assert_eq!(err.transport_kind(), Some(TransportErrorKind::HttpStatus));
    }

    #[tokio::test]
    async fn test_non_json_reply_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1.1/connect/site-info"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html/>"))
            .mount(&mock_server)
            .await;

        let err = probe_for(&mock_server)
            .has_jetpack("http://myblog.example", "ua")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Parse(_)));
    }
}
