//! Really Simple Discovery (RSD) documents.
//!
//! An RSD document lists the publishing APIs a blog supports. The XML-RPC
//! endpoint is the `apiLink` of the `WordPress` entry:
//!
//! ```xml
//! <rsd version="1.0" xmlns="http://archipelago.phrasewise.com/rsd">
//!   <service>
//!     <engineName>WordPress</engineName>
//!     <apis>
//!       <api name="WordPress" blogID="1" preferred="true" apiLink="https://example.com/xmlrpc.php" />
//!     </apis>
//!   </service>
//! </rsd>
//! ```

use super::probe::probe_endpoint;
use super::run_cancellable;
use crate::fetcher::PageFetcher;
use crate::xmlrpc::XmlRpcTransport;
use crate::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

/// Query suffix WordPress puts on its RSD link (`xmlrpc.php?rsd`).
pub const RSD_QUERY_SUFFIX: &str = "?rsd";

/// API name of the WordPress entry in an RSD document.
const WORDPRESS_API: &str = "WordPress";

/// Extracts the XML-RPC endpoint advertised by an RSD document.
pub trait RsdParser: Send + Sync {
    /// Returns `Ok(None)` if the document is valid RSD without a WordPress API.
    fn parse_endpoint(&self, document: &str) -> Result<Option<String>>;
}

/// [`RsdParser`] built on `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickXmlRsdParser;

impl RsdParser for QuickXmlRsdParser {
    fn parse_endpoint(&self, document: &str) -> Result<Option<String>> {
        let mut reader = Reader::from_str(document);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut seen_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e) | Event::Empty(e)) => {
                    if !seen_root {
                        if !e.local_name().as_ref().eq_ignore_ascii_case(b"rsd") {
                            return Err(Error::Parse(format!(
                                "Expected <rsd> root element, found <{}>",
                                String::from_utf8_lossy(e.local_name().as_ref())
                            )));
                        }
                        seen_root = true;
                    } else if e.local_name().as_ref() == b"api" {
                        if let Some(link) = wordpress_api_link(&e)? {
                            return Ok(Some(link));
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Parse(format!("XML parse error: {e}"))),
                _ => {},
            }
            buf.clear();
        }

        if seen_root {
            Ok(None)
        } else {
            Err(Error::Parse("Document has no root element".to_string()))
        }
    }
}

/// The `apiLink` of an `<api>` element, if it is the WordPress API.
fn wordpress_api_link(element: &BytesStart<'_>) -> Result<Option<String>> {
    let mut name = None;
    let mut link = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|e| Error::Parse(format!("Bad attribute: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Parse(e.to_string()))?;
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(value.into_owned()),
            b"apiLink" => link = Some(value.trim().to_string()),
            _ => {},
        }
    }

    let is_wordpress = name.is_some_and(|n| n.eq_ignore_ascii_case(WORDPRESS_API));
    Ok(link.filter(|l| is_wordpress && !l.is_empty()))
}

/// Turns an RSD link into a validated XML-RPC endpoint.
pub struct RsdResolver<'a> {
    /// Used to validate the endpoint.
    pub transport: &'a dyn XmlRpcTransport,
    /// Used to download the RSD document.
    pub pages: &'a dyn PageFetcher,
    /// Used to read the RSD document.
    pub parser: &'a dyn RsdParser,
}

impl RsdResolver<'_> {
    /// Resolve `link`, as found on the page at `page_url`, to a working endpoint.
    ///
    /// Relative links are resolved against `page_url`.
    ///
    /// - A link ending in `?rsd` points at the endpoint itself: the suffix is
    ///   stripped and the result probed. Any failure is reported as
    ///   [`Error::Invalid`].
    /// - Otherwise the document is downloaded and parsed, and the endpoint it
    ///   advertises is probed. Download failures propagate; an unreadable
    ///   document or missing endpoint is [`Error::Invalid`].
    #[instrument(skip_all, fields(link = %link))]
    pub async fn resolve(
        &self,
        link: &str,
        page_url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Url> {
        if let Some(stripped) = link.strip_suffix(RSD_QUERY_SUFFIX) {
            return self.probe_stripped(stripped, page_url, cancel).await;
        }

        let rsd_url = page_url.join(link).map_err(|e| {
            debug!(error = %e, "RSD link is not a valid URL");
            Error::Invalid
        })?;

        debug!(rsd_url = %rsd_url, "Fetching RSD document");
        let document = run_cancellable(cancel, async {
            self.pages.fetch_text(&rsd_url).await.map_err(Error::from)
        })
        .await?;

        let endpoint = match self.parser.parse_endpoint(&document) {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                debug!("RSD document does not advertise a WordPress API");
                return Err(Error::Invalid);
            },
            Err(e) => {
                debug!(error = %e, "Could not parse RSD document");
                return Err(Error::Invalid);
            },
        };

        let endpoint = rsd_url.join(&endpoint).map_err(|e| {
            debug!(endpoint = %endpoint, error = %e, "RSD endpoint is not a valid URL");
            Error::Invalid
        })?;

        debug!(endpoint = %endpoint, "Found WordPress API in RSD document");
        probe_endpoint(self.transport, &endpoint, cancel).await
    }

    async fn probe_stripped(
        &self,
        stripped: &str,
        page_url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Url> {
        let endpoint = page_url.join(stripped).map_err(|e| {
            debug!(error = %e, "Stripped RSD link is not a valid URL");
            Error::Invalid
        })?;

        debug!(endpoint = %endpoint, "RSD link points at the endpoint, probing it directly");
        match probe_endpoint(self.transport, &endpoint, cancel).await {
            Ok(url) => Ok(url),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                // The probe failure is reported as Invalid; keep the cause in the log.
                debug!(category = e.category(), error = %e, "Direct probe of RSD endpoint failed");
                Err(Error::Invalid)
            },
        }
    }
}
