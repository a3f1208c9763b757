//! WordPress XML-RPC endpoint discovery.
//!
//! Given whatever a user typed into a "site address" field, find the exact URL
//! of the site's XML-RPC endpoint and confirm that it speaks the WordPress API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use wpdisco_core::discovery::discover;
//!
//! # async fn example() {
//! match discover("myblog.example", "MyApp/1.0").await {
//!     Ok(endpoint) => println!("XML-RPC endpoint: {endpoint}"),
//!     Err(e) if e.has_jetpack => println!("{e} (the site runs Jetpack)"),
//!     Err(e) => println!("{e}"),
//! }
//! # }
//! ```
//!
//! ## Fallback Chain
//!
//! [`Discoverer::discover`] tries, in order:
//!
//! 1. `{site}/xmlrpc.php` - the usual location
//! 2. `{site}` as typed - the user may have entered the endpoint itself
//! 3. The site's home page - its `EditURI` link names an RSD document that
//!    advertises the endpoint
//!
//! If all of them fail, the WordPress.com API is asked whether the site runs
//! Jetpack, and the answer is attached to the error.
//!
//! Some failures of the first step end discovery right away: an unknown host,
//! a dropped connection, a demand for authentication, or a mobile plugin
//! intercepting requests.

pub mod extract;
pub mod orchestrator;
pub mod probe;
pub mod rsd;

pub use extract::extract_rsd_link;
pub use orchestrator::{Discoverer, discover};
pub use probe::{REDIRECT_LIMIT, probe_endpoint};
pub use rsd::{QuickXmlRsdParser, RsdParser, RsdResolver};

use crate::{Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `future` unless `cancel` fires first.
///
/// A token that is already cancelled wins without polling `future`.
pub(crate) async fn run_cancellable<T, F>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_cancellable_completes() {
        let cancel = CancellationToken::new();
        let value = run_cancellable(&cancel, async { Ok::<_, Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_cancellable_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_cancellable(&cancel, std::future::pending::<Result<()>>()).await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_cancellable_interrupts_pending_work() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = run_cancellable(&cancel, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, Error>(())
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
