//! Job that refreshes the snapshot of every tracked token.
//!
//! Per token: fetch both sources, merge, write the cache with a TTL.
//! Each token is refreshed in its own task. A failure for one token is
//! logged and never aborts the others; that token's previous snapshot is
//! left to expire on its own. A sweep waits for its refreshes only up to a
//! deadline: a token still backing off past it keeps running in the
//! background and is skipped by later sweeps until it finishes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashSet;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::cache::{CacheError, SnapshotCache};
use crate::config::{SweepSettings, TrackedToken};
use crate::merge::{merge, MergeError};
use crate::models::CanonicalRecord;
use crate::sources::{FetchError, MarketFeed};

/// Everything that can fail for a single token during a sweep.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub refreshed: usize,
    pub failed: usize,
    /// Previous refresh still running, not started again
    pub skipped: usize,
    /// Started by this sweep but not finished by its deadline
    pub pending: usize,
}

/// Fetches, merges and caches one token.
///
/// Both sources are queried concurrently; the first failure abandons the
/// token (and cancels the other in-flight fetch).
pub async fn refresh_token(
    feed: &dyn MarketFeed,
    cache: &SnapshotCache,
    token: &TrackedToken,
    ttl: Duration,
) -> Result<CanonicalRecord, TokenError> {
    let (primary, secondary) =
        tokio::try_join!(feed.fetch_primary(token), feed.fetch_secondary(token))?;

    let record = merge(&primary, &secondary)?;
    cache.set(&record.token_address, &record, ttl).await?;

    Ok(record)
}

/// Addresses whose refresh task has not finished yet.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    addresses: Arc<DashSet<String>>,
}

impl InFlight {
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    fn claim(&self, address: &str) -> Option<Claim> {
        self.addresses.insert(address.to_string()).then(|| Claim {
            addresses: self.addresses.clone(),
            address: address.to_string(),
        })
    }
}

/// Releases its address when the refresh task ends, including on panic.
struct Claim {
    addresses: Arc<DashSet<String>>,
    address: String,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.addresses.remove(&self.address);
    }
}

/// Runs sweeps against one feed and cache.
pub struct TokenRefresher {
    feed: Arc<dyn MarketFeed>,
    cache: SnapshotCache,
    in_flight: InFlight,
    permits: Arc<Semaphore>,
    ttl: Duration,
    deadline: Duration,
}

impl TokenRefresher {
    pub fn new(feed: Arc<dyn MarketFeed>, cache: SnapshotCache, settings: &SweepSettings) -> Self {
        Self {
            feed,
            cache,
            in_flight: InFlight::default(),
            permits: Arc::new(Semaphore::new(settings.concurrency.max(1))),
            ttl: settings.snapshot_ttl(),
            // Records written early in the sweep must still be live when it ends
            deadline: settings.interval().min(settings.snapshot_ttl()),
        }
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Runs one sweep over `tokens`.
    pub async fn run(&self, tokens: &[TrackedToken]) -> SweepReport {
        info!("Starting refresh_tokens job for {} tokens...", tokens.len());

        let start = Instant::now();
        let mut report = SweepReport::default();

        let mut tasks: FuturesUnordered<JoinHandle<bool>> = FuturesUnordered::new();
        for token in tokens {
            match self.in_flight.claim(&token.address) {
                Some(claim) => tasks.push(self.spawn_refresh(token.clone(), claim)),
                None => {
                    warn!(
                        "Previous refresh of {} still running, skipping it this sweep",
                        token.address
                    );
                    report.skipped += 1;
                },
            }
        }

        let deadline = tokio::time::Instant::now() + self.deadline;
        while !tasks.is_empty() {
            match tokio::time::timeout_at(deadline, tasks.next()).await {
                Ok(Some(Ok(true))) => report.refreshed += 1,
                Ok(Some(Ok(false))) => report.failed += 1,
                Ok(Some(Err(e))) => {
                    error!("Refresh task failed: {}", e);
                    report.failed += 1;
                },
                Ok(None) => break,
                Err(_) => {
                    // Dropping the handles detaches the tasks; they keep their claims
                    report.pending = tasks.len();
                    warn!(
                        "{} token refreshes still running after {:?}, continuing in background",
                        report.pending, self.deadline
                    );
                    break;
                },
            }
        }

        info!(
            "Refreshed {} tokens ({} failed, {} skipped, {} pending) in {:?}",
            report.refreshed,
            report.failed,
            report.skipped,
            report.pending,
            start.elapsed()
        );

        report
    }

    fn spawn_refresh(&self, token: TrackedToken, claim: Claim) -> JoinHandle<bool> {
        let feed = self.feed.clone();
        let cache = self.cache.clone();
        let permits = self.permits.clone();
        let ttl = self.ttl;

        tokio::spawn(async move {
            let _claim = claim;
            // The semaphore is never closed
            let Ok(_permit) = permits.acquire_owned().await else {
                return false;
            };

            match refresh_token(feed.as_ref(), &cache, &token, ttl).await {
                Ok(_) => true,
                Err(e) => {
                    error!("Failed to refresh token {}: {}", token.address, e);
                    false
                },
            }
        })
    }
}
