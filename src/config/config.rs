use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

/// HTTP listener for the query surface and observer WebSocket.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Upstream market-data providers.
///
/// DexScreener is the primary source (queried by token address),
/// GeckoTerminal the secondary one (queried by pool address).
#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    #[serde(default = "default_dexscreener_url")]
    pub dexscreener_url: String,
    #[serde(default = "default_geckoterminal_url")]
    pub geckoterminal_url: String,
    /// GeckoTerminal network slug, also the prefix of its token ids
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            dexscreener_url: default_dexscreener_url(),
            geckoterminal_url: default_geckoterminal_url(),
            network: default_network(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SourceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_dexscreener_url() -> String {
    "https://api.dexscreener.com".to_string()
}

fn default_geckoterminal_url() -> String {
    "https://api.geckoterminal.com/api/v2".to_string()
}

fn default_network() -> String {
    "solana".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Retry policy for rate-limited requests against the secondary source.
///
/// Delay before retry `n` (0-based index of the failed attempt) is
/// `base_delay * 2^n` plus up to `max_jitter` of random jitter.
#[derive(Debug, Deserialize, Clone)]
pub struct BackoffSettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_attempts: default_max_attempts(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_max_jitter_ms() -> u64 {
    500
}

/// Sweep cadence and snapshot lifetime.
///
/// The snapshot TTL is deliberately independent of the interval: with the
/// defaults (30s / 40s) a token disappears after two missed sweeps.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
    /// Maximum number of tokens fetched at the same time within one sweep
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub backoff: BackoffSettings,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
            concurrency: default_concurrency(),
            backoff: BackoffSettings::default(),
        }
    }
}

impl SweepSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_snapshot_ttl_secs() -> u64 {
    40
}

fn default_concurrency() -> usize {
    4
}

/// A token tracked by every sweep.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TrackedToken {
    /// Token mint address, the DexScreener lookup key
    pub address: String,
    /// Pool address, the GeckoTerminal lookup key
    pub pool: String,
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup. Everything except the tracked
/// token list has a default.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub sources: SourceSettings,
    #[serde(default)]
    pub sweep: SweepSettings,
    pub tokens: Vec<TrackedToken>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
