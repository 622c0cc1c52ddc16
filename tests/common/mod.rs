#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use tokenwatch::config::TrackedToken;
use tokenwatch::models::{CanonicalRecord, PartialRecord, TxnCounts, Windowed};
use tokenwatch::sources::{retry_rate_limited, BackoffPolicy, FetchError, MarketFeed, SourceError};

/// Canned answer for one source and one token.
#[derive(Debug, Clone)]
pub enum Reply {
    Record(PartialRecord),
    /// Non-2xx from the upstream
    SourceDown,
    /// Already failed after exhausting its retries
    Exhausted,
    /// Signals rate limiting on every attempt
    RateLimited,
}

impl Reply {
    fn resolve(&self, source_name: &'static str) -> Result<PartialRecord, FetchError> {
        match self {
            Reply::Record(record) => Ok(record.clone()),
            Reply::SourceDown => Err(SourceError::Status {
                source_name,
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            }
            .into()),
            Reply::Exhausted => Err(FetchError::RetriesExhausted {
                source_name,
                attempts: 5,
            }),
            Reply::RateLimited => Err(FetchError::RateLimited { source_name }),
        }
    }
}

/// In-memory [`MarketFeed`] answering from a per-token script.
#[derive(Default)]
pub struct ScriptedFeed {
    primary: HashMap<String, Reply>,
    secondary: HashMap<String, Reply>,
    backoff: BackoffPolicy,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(mut self, address: &str, primary: Reply, secondary: Reply) -> Self {
        self.primary.insert(address.to_string(), primary);
        self.secondary.insert(address.to_string(), secondary);
        self
    }

    /// Fetch attempts made so far, retries included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(
        &self,
        script: &HashMap<String, Reply>,
        token: &TrackedToken,
        source_name: &'static str,
    ) -> Result<PartialRecord, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match script.get(&token.address) {
            Some(reply) => reply.resolve(source_name),
            None => Reply::SourceDown.resolve(source_name),
        }
    }
}

#[async_trait]
impl MarketFeed for ScriptedFeed {
    async fn fetch_primary(&self, token: &TrackedToken) -> Result<PartialRecord, FetchError> {
        self.answer(&self.primary, token, "dexscreener").await
    }

    async fn fetch_secondary(&self, token: &TrackedToken) -> Result<PartialRecord, FetchError> {
        retry_rate_limited(&self.backoff, "geckoterminal", |_| {
            self.answer(&self.secondary, token, "geckoterminal")
        })
        .await
    }
}

pub fn tracked(address: &str) -> TrackedToken {
    TrackedToken {
        address: address.to_string(),
        pool: format!("pool-{address}"),
    }
}

/// Complete primary-source record.
pub fn primary(address: &str, volume_1h: f64) -> PartialRecord {
    PartialRecord {
        token_address: Some(address.to_string()),
        token_name: Some(format!("{address} Token")),
        token_ticker: Some(address.to_uppercase()),
        price_usd: Some(1.5),
        market_cap_usd: Some(1_000_000.0),
        liquidity_usd: Some(250_000.0),
        volume: Windowed {
            h1: Some(volume_1h),
            h6: Some(volume_1h * 6.0),
            h24: Some(volume_1h * 24.0),
        },
        transactions: Windowed {
            h1: Some(TxnCounts::new(10, 5)),
            h6: Some(TxnCounts::new(60, 30)),
            h24: Some(TxnCounts::new(240, 120)),
        },
        price_change: Windowed {
            h1: Some(1.0),
            h6: Some(-2.0),
            h24: Some(3.0),
        },
        protocol: Some("raydium".to_string()),
    }
}

/// Secondary-source record, without a token name.
pub fn secondary(address: &str) -> PartialRecord {
    PartialRecord {
        token_address: Some(address.to_string()),
        token_name: None,
        token_ticker: Some(address.to_uppercase()),
        price_usd: Some(1.4),
        market_cap_usd: Some(900_000.0),
        liquidity_usd: Some(240_000.0),
        volume: Windowed {
            h1: Some(1.0),
            h6: Some(6.0),
            h24: Some(24.0),
        },
        transactions: Windowed {
            h1: Some(TxnCounts::new(1, 1)),
            h6: Some(TxnCounts::new(6, 6)),
            h24: Some(TxnCounts::new(24, 24)),
        },
        price_change: Windowed {
            h1: Some(0.5),
            h6: Some(0.5),
            h24: Some(0.5),
        },
        protocol: Some("raydium-clmm".to_string()),
    }
}

pub fn healthy(address: &str, volume_1h: f64) -> (Reply, Reply) {
    (
        Reply::Record(primary(address, volume_1h)),
        Reply::Record(secondary(address)),
    )
}

pub fn canonical(address: &str, volume_1h: f64) -> CanonicalRecord {
    CanonicalRecord {
        token_address: address.to_string(),
        token_name: format!("{address} Token"),
        token_ticker: address.to_uppercase(),
        price_usd: 1.5,
        market_cap_usd: 1_000_000.0,
        volume_1h,
        volume_6h: volume_1h * 6.0,
        volume_24h: volume_1h * 24.0,
        liquidity_usd: 250_000.0,
        transaction_count_1h: 15,
        transaction_count_6h: 90,
        transaction_count_24h: 360,
        price_1hr_change: 1.0,
        price_6hr_change: -2.0,
        price_24hr_change: 3.0,
        protocol: "raydium".to_string(),
    }
}
