//! # wpdisco-core
//!
//! Discovery and validation of WordPress XML-RPC endpoints.
//!
//! Users type all sorts of things into a "site address" field: bare host names,
//! home pages with trailing slashes, the endpoint itself, or addresses of sites
//! that moved behind a redirect. This crate turns such input into the exact URL
//! of the site's XML-RPC endpoint, after confirming that the endpoint answers
//! with the WordPress API.
//!
//! ## Architecture
//!
//! - **Normalization**: user input to candidate URLs ([`normalize`])
//! - **Probing**: the `system.listMethods` capability check with redirect
//!   handling ([`discovery::probe`])
//! - **Scraping**: the `EditURI` link on the home page and the RSD document it
//!   points at ([`discovery::extract`], [`discovery::rsd`])
//! - **Orchestration**: the fallback chain tying it together ([`Discoverer`])
//!
//! Network access goes through the [`XmlRpcTransport`], [`PageFetcher`], and
//! [`JetpackProbe`] traits, each with an HTTP implementation built on `reqwest`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use wpdisco_core::{Config, Discoverer};
//!
//! # async fn example() -> wpdisco_core::Result<()> {
//! let config = Config::load()?;
//! let discoverer = Discoverer::new(&config)?;
//!
//! match discoverer
//!     .discover("myblog.example", "MyApp/1.0", &CancellationToken::new())
//!     .await
//! {
//!     Ok(endpoint) => println!("Endpoint: {endpoint}"),
//!     Err(e) => eprintln!("{} ({})", e, e.error.category()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`Result<T, Error>`]. Discovery returns a
//! [`DiscoveryError`], which adds the Jetpack hint:
//!
//! ```rust
//! use wpdisco_core::{Error, normalize::normalize};
//!
//! match normalize("ftp://example.com", true) {
//!     Ok(url) => println!("{url}"),
//!     Err(Error::InvalidScheme(scheme)) => eprintln!("unsupported scheme {scheme}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

/// Configuration loading and defaults
pub mod config;
/// Endpoint discovery
pub mod discovery;
/// Error types and result aliases
pub mod error;
/// Plain HTTP page fetching
pub mod fetcher;
/// Jetpack detection
pub mod jetpack;
/// Site address normalization
pub mod normalize;
/// Minimal XML-RPC client
pub mod xmlrpc;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{Config, HttpConfig, JetpackConfig};
pub use discovery::{Discoverer, discover};
pub use error::{DiscoveryError, Error, Result, TransportError, TransportErrorKind};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use jetpack::{JetpackProbe, WpComJetpackProbe};
pub use normalize::{CandidateUrl, Candidates};
pub use xmlrpc::{HttpXmlRpcTransport, RpcResponse, RpcValue, XmlRpcTransport};
