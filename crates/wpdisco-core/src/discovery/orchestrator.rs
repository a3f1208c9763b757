use super::extract::extract_rsd_link;
use super::probe::probe_endpoint;
use super::rsd::{QuickXmlRsdParser, RsdParser, RsdResolver};
use super::run_cancellable;
use crate::config::Config;
use crate::fetcher::{HttpPageFetcher, PageFetcher};
use crate::jetpack::{JetpackProbe, WpComJetpackProbe};
use crate::normalize::{CandidateUrl, Candidates};
use crate::xmlrpc::{HttpXmlRpcTransport, XmlRpcTransport};
use crate::{DiscoveryError, Error, Result};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Where discovery stands. Each stage either finishes discovery or hands over
/// to the next one.
#[derive(Debug)]
enum Stage {
    ProbeAugmented,
    ProbeRaw,
    ScrapeHtml,
    EnrichAndFail(Error),
}

/// Runs the discovery fallback chain with pluggable collaborators.
///
/// Cheap to clone; clones share the collaborators, so one `Discoverer` can
/// serve many concurrent discoveries.
#[derive(Clone)]
pub struct Discoverer {
    transport: Arc<dyn XmlRpcTransport>,
    pages: Arc<dyn PageFetcher>,
    rsd_parser: Arc<dyn RsdParser>,
    jetpack: Option<Arc<dyn JetpackProbe>>,
}

impl fmt::Debug for Discoverer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discoverer")
            .field("jetpack", &self.jetpack.is_some())
            .finish_non_exhaustive()
    }
}

impl Discoverer {
    /// Create a discoverer with the network-backed collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the Jetpack API base is not a valid URL.
    pub fn new(config: &Config) -> Result<Self> {
        let jetpack: Option<Arc<dyn JetpackProbe>> = if config.jetpack.enabled {
            Some(Arc::new(WpComJetpackProbe::from_config(config)?))
        } else {
            None
        };

        Ok(Self {
            transport: Arc::new(HttpXmlRpcTransport::new(config.http.clone())),
            pages: Arc::new(HttpPageFetcher::new(config.http.clone())),
            rsd_parser: Arc::new(QuickXmlRsdParser),
            jetpack,
        })
    }

    /// Replace the XML-RPC transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn XmlRpcTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the page fetcher used for home pages and RSD documents.
    #[must_use]
    pub fn with_page_fetcher(mut self, pages: Arc<dyn PageFetcher>) -> Self {
        self.pages = pages;
        self
    }

    /// Replace the RSD parser.
    #[must_use]
    pub fn with_rsd_parser(mut self, rsd_parser: Arc<dyn RsdParser>) -> Self {
        self.rsd_parser = rsd_parser;
        self
    }

    /// Replace the Jetpack probe; `None` skips enrichment.
    #[must_use]
    pub fn with_jetpack(mut self, jetpack: Option<Arc<dyn JetpackProbe>>) -> Self {
        self.jetpack = jetpack;
        self
    }

    /// Find and validate the XML-RPC endpoint of `site`.
    ///
    /// `user_agent` identifies the calling application to the Jetpack API.
    ///
    /// # Errors
    ///
    /// Normalization errors are returned as-is. Otherwise the error is the one
    /// that ended discovery: a terminal failure of the first probe, or the
    /// failure of the last fallback stage, with
    /// [`DiscoveryError::has_jetpack`] set if the site runs Jetpack.
    /// Cancellation yields [`Error::Cancelled`] and skips the Jetpack check.
    #[instrument(skip_all, fields(site = %site))]
    pub async fn discover(
        &self,
        site: &str,
        user_agent: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Url, DiscoveryError> {
        let candidates = Candidates::from_input(site).inspect_err(|e| {
            debug!(category = e.category(), error = %e, "Site address rejected");
        })?;

        let mut stage = Stage::ProbeAugmented;
        loop {
            debug!(?stage, "Entering discovery stage");
            stage = match stage {
                Stage::ProbeAugmented => {
                    match probe_endpoint(self.transport.as_ref(), candidates.augmented.as_url(), cancel)
                        .await
                    {
                        Ok(endpoint) => return Ok(found(endpoint)),
                        Err(e) if e.is_terminal() || matches!(e, Error::Cancelled) => {
                            info!(category = e.category(), "Discovery stopped: {e}");
                            return Err(e.into());
                        },
                        Err(e) => {
                            debug!(category = e.category(), error = %e, "Probe of {} failed", candidates.augmented);
                            Stage::ProbeRaw
                        },
                    }
                },
                Stage::ProbeRaw => {
                    match probe_endpoint(self.transport.as_ref(), candidates.raw.as_url(), cancel).await {
                        Ok(endpoint) => return Ok(found(endpoint)),
                        Err(Error::Cancelled) => return Err(Error::Cancelled.into()),
                        Err(e) => {
                            debug!(category = e.category(), error = %e, "Probe of {} failed", candidates.raw);
                            Stage::ScrapeHtml
                        },
                    }
                },
                Stage::ScrapeHtml => match self.scrape_html(&candidates.raw, cancel).await {
                    Ok(endpoint) => return Ok(found(endpoint)),
                    Err(Error::Cancelled) => return Err(Error::Cancelled.into()),
                    Err(e) => {
                        debug!(category = e.category(), error = %e, "Home page discovery failed");
                        Stage::EnrichAndFail(e)
                    },
                },
                Stage::EnrichAndFail(error) => {
                    let failure = self
                        .enrich(error, candidates.raw.as_str(), user_agent, cancel)
                        .await;
                    info!(
                        category = failure.error.category(),
                        has_jetpack = failure.has_jetpack,
                        "Discovery failed: {failure}"
                    );
                    return Err(failure);
                },
            };
        }
    }

    /// Look for an `EditURI` link on the page at `raw` and follow it.
    async fn scrape_html(&self, raw: &CandidateUrl, cancel: &CancellationToken) -> Result<Url> {
        let page_url = raw.as_url();
        let html = run_cancellable(cancel, async {
            self.pages.fetch_text(page_url).await.map_err(Error::from)
        })
        .await?;

        let Some(link) = extract_rsd_link(&html) else {
            debug!(page = %page_url, "No RSD link on page");
            return Err(Error::Invalid);
        };

        debug!(page = %page_url, link = %link, "Found RSD link");
        let resolver = RsdResolver {
            transport: self.transport.as_ref(),
            pages: self.pages.as_ref(),
            parser: self.rsd_parser.as_ref(),
        };
        resolver.resolve(&link, page_url, cancel).await
    }

    /// Attach the Jetpack hint to `error`. Probe failures leave it untouched.
    async fn enrich(
        &self,
        error: Error,
        site: &str,
        user_agent: &str,
        cancel: &CancellationToken,
    ) -> DiscoveryError {
        let Some(jetpack) = &self.jetpack else {
            return DiscoveryError::new(error);
        };

        match run_cancellable(cancel, jetpack.has_jetpack(site, user_agent)).await {
            Ok(has_jetpack) => DiscoveryError { error, has_jetpack },
            Err(Error::Cancelled) => DiscoveryError::new(Error::Cancelled),
            Err(e) => {
                warn!(site = %site, error = %e, "Jetpack check failed");
                DiscoveryError::new(error)
            },
        }
    }
}

fn found(endpoint: Url) -> Url {
    info!(endpoint = %endpoint, "Found WordPress XML-RPC endpoint");
    endpoint
}

/// Discover the endpoint of `site` with the default configuration.
///
/// # Errors
///
/// See [`Discoverer::discover`].
pub async fn discover(site: &str, user_agent: &str) -> std::result::Result<Url, DiscoveryError> {
    Discoverer::new(&Config::default())?
        .discover(site, user_agent, &CancellationToken::new())
        .await
}
