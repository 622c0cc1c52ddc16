//! Upstream market-data sources.
//!
//! - [`dexscreener`] - primary source, single attempt per sweep
//! - [`geckoterminal`] - secondary source, retried with [`backoff`] when rate limited
//!
//! [`MarketFeed`] is the seam the sweep job fetches through;
//! [`HttpMarketFeed`] is the production implementation.

pub mod backoff;
mod de;
pub mod dexscreener;
pub mod geckoterminal;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::config::{SourceSettings, SweepSettings, TrackedToken};
use crate::models::PartialRecord;

pub use backoff::{retry_rate_limited, BackoffPolicy};
pub use dexscreener::DexScreenerClient;
pub use geckoterminal::GeckoTerminalClient;

/// Upstream failure that is not a rate-limit signal.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name}: request failed: {cause}")]
    Request {
        source_name: &'static str,
        #[source]
        cause: reqwest::Error,
    },
    #[error("{source_name}: unexpected status {status}")]
    Status {
        source_name: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("{source_name}: malformed body: {cause}")]
    Malformed {
        source_name: &'static str,
        #[source]
        cause: serde_json::Error,
    },
    #[error("{source_name}: response contained no data")]
    Empty { source_name: &'static str },
    #[error("{source_name}: invalid request url: {cause}")]
    Url {
        source_name: &'static str,
        #[source]
        cause: url::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{source_name}: rate limited")]
    RateLimited { source_name: &'static str },
    #[error("{source_name}: still rate limited after {attempts} attempts")]
    RetriesExhausted {
        source_name: &'static str,
        attempts: u32,
    },
}

/// Parses a base URL and guarantees a trailing slash so relative joins
/// append instead of replacing the last path segment.
fn normalize_base_url(base_url: &str) -> anyhow::Result<Url> {
    let mut normalized = base_url.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).with_context(|| format!("Invalid source URL: {}", base_url))
}

/// Retrieves one partial record per token from each upstream source.
///
/// Implementations perform network I/O only and hold no shared mutable state.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Primary source, single attempt.
    async fn fetch_primary(&self, token: &TrackedToken) -> Result<PartialRecord, FetchError>;

    /// Secondary source, with rate-limit backoff.
    async fn fetch_secondary(&self, token: &TrackedToken) -> Result<PartialRecord, FetchError>;
}

/// [`MarketFeed`] backed by the DexScreener and GeckoTerminal HTTP APIs.
#[derive(Debug, Clone)]
pub struct HttpMarketFeed {
    dexscreener: DexScreenerClient,
    geckoterminal: GeckoTerminalClient,
    backoff: BackoffPolicy,
}

impl HttpMarketFeed {
    pub fn new(sources: &SourceSettings, sweep: &SweepSettings) -> anyhow::Result<Self> {
        let timeout = sources.request_timeout();

        Ok(Self {
            dexscreener: DexScreenerClient::new(&sources.dexscreener_url, timeout)
                .context("Failed to build DexScreener client")?,
            geckoterminal: GeckoTerminalClient::new(
                &sources.geckoterminal_url,
                &sources.network,
                timeout,
            )
            .context("Failed to build GeckoTerminal client")?,
            backoff: BackoffPolicy::from(&sweep.backoff),
        })
    }
}

#[async_trait]
impl MarketFeed for HttpMarketFeed {
    async fn fetch_primary(&self, token: &TrackedToken) -> Result<PartialRecord, FetchError> {
        self.dexscreener.token_pairs(&token.address).await
    }

    async fn fetch_secondary(&self, token: &TrackedToken) -> Result<PartialRecord, FetchError> {
        retry_rate_limited(&self.backoff, geckoterminal::SOURCE_NAME, |_| {
            self.geckoterminal.pool(&token.pool)
        })
        .await
    }
}
