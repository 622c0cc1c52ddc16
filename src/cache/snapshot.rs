use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use moka::future::Cache;
use moka::Expiry;
use thiserror::Error;

use crate::models::{cache_key, CanonicalRecord};

/// Upper bound on stored snapshots; far above any realistic tracked set
const MAX_SNAPSHOTS: u64 = 100_000;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to encode snapshot for {key}: {cause}")]
    Encode {
        key: String,
        #[source]
        cause: serde_json::Error,
    },
}

/// Serialized record plus the lifetime it was written with.
#[derive(Debug, Clone)]
struct Snapshot {
    payload: Arc<str>,
    ttl: Duration,
    written_at: Instant,
}

impl Snapshot {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.written_at) < self.ttl
    }
}

/// Each entry expires `ttl` after its last write; reads never extend it.
struct SnapshotExpiry;

impl Expiry<String, Snapshot> for SnapshotExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Snapshot,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Snapshot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Expiring key-value store of the latest [`CanonicalRecord`] per token.
///
/// Keys are `token:{address}`, values are the JSON-encoded record. Expiry
/// is a property of the store: an entry whose TTL elapsed is invisible to
/// reads whether or not it has been evicted yet. Cloning is cheap and
/// every clone shares the same storage.
#[derive(Clone)]
pub struct SnapshotCache {
    entries: Cache<String, Snapshot>,
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCache {
    pub fn new() -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_SNAPSHOTS)
            .expire_after(SnapshotExpiry)
            .build();

        Self { entries }
    }

    /// Upserts `record` under its token address, replacing any prior value
    /// and restarting the expiry countdown from now.
    pub async fn set(
        &self,
        token_address: &str,
        record: &CanonicalRecord,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = cache_key(token_address);
        let payload = serde_json::to_string(record).map_err(|cause| CacheError::Encode {
            key: key.clone(),
            cause,
        })?;

        self.insert_payload(key, payload.into(), ttl).await;
        Ok(())
    }

    async fn insert_payload(&self, key: String, payload: Arc<str>, ttl: Duration) {
        self.entries
            .insert(
                key,
                Snapshot {
                    payload,
                    ttl,
                    written_at: Instant::now(),
                },
            )
            .await;
    }

    /// Latest live record for one token, if any.
    pub async fn get(&self, token_address: &str) -> Option<CanonicalRecord> {
        let key = cache_key(token_address);
        let snapshot = self.entries.get(&key).await?;
        if !snapshot.is_live(Instant::now()) {
            return None;
        }
        decode(&key, &snapshot.payload)
    }

    /// Every live record, ordered by token address.
    ///
    /// A snapshot that no longer decodes is logged and left out; the rest
    /// of the result is unaffected.
    pub fn scan_all(&self) -> Vec<CanonicalRecord> {
        let now = Instant::now();

        let mut records: Vec<CanonicalRecord> = self
            .entries
            .iter()
            // Pending-housekeeping entries may still be iterable
            .filter(|(_, snapshot)| snapshot.is_live(now))
            .filter_map(|(key, snapshot)| decode(&key, &snapshot.payload))
            .collect();

        records.sort_by(|a, b| a.token_address.cmp(&b.token_address));
        records
    }
}

fn decode(key: &str, payload: &str) -> Option<CanonicalRecord> {
    match serde_json::from_str(payload) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Dropping undecodable snapshot {}: {}", key, e);
            None
        },
    }
}
