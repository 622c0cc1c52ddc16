use serde::{Deserialize, Serialize};

use super::Window;

/// Per-window values as reported by an upstream source.
///
/// Any window may be missing from a response.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Windowed<T> {
    pub h1: Option<T>,
    pub h6: Option<T>,
    pub h24: Option<T>,
}

impl<T: Copy> Windowed<T> {
    pub fn get(&self, window: Window) -> Option<T> {
        match window {
            Window::H1 => self.h1,
            Window::H6 => self.h6,
            Window::H24 => self.h24,
        }
    }
}

/// Buy and sell counts for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxnCounts {
    pub buys: Option<u64>,
    pub sells: Option<u64>,
}

impl TxnCounts {
    pub fn new(buys: u64, sells: u64) -> Self {
        Self {
            buys: Some(buys),
            sells: Some(sells),
        }
    }

    /// Total transactions, or `None` when neither side was reported
    pub fn total(&self) -> Option<u64> {
        match (self.buys, self.sells) {
            (None, None) => None,
            (buys, sells) => Some(buys.unwrap_or(0).saturating_add(sells.unwrap_or(0))),
        }
    }
}

/// One upstream source's view of a token.
///
/// Every field is optional: sources omit, null out, or zero fields
/// independently. [`crate::merge::merge`] reconciles two of these.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    // Identity
    pub token_address: Option<String>,
    pub token_name: Option<String>,
    pub token_ticker: Option<String>,

    // Market state
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,

    // Rolling windows
    pub volume: Windowed<f64>,
    pub transactions: Windowed<TxnCounts>,
    pub price_change: Windowed<f64>,

    /// Exchange / AMM identifier (e.g. "raydium")
    pub protocol: Option<String>,
}

/// Reconciled market state for one tracked token.
///
/// Primary Key: token_address
/// Stored as JSON in the snapshot cache under `token:{token_address}` and
/// overwritten on every successful sweep. Field names are the public wire
/// names used by the query surface and broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    // Identity
    pub token_address: String,
    pub token_name: String,
    pub token_ticker: String,

    // Market state
    pub price_usd: f64,
    pub market_cap_usd: f64,

    // Volume (USD)
    pub volume_1h: f64,
    pub volume_6h: f64,
    pub volume_24h: f64,

    pub liquidity_usd: f64,

    // Buys + sells
    pub transaction_count_1h: u64,
    pub transaction_count_6h: u64,
    pub transaction_count_24h: u64,

    // Price change (percent)
    pub price_1hr_change: f64,
    pub price_6hr_change: f64,
    pub price_24hr_change: f64,

    pub protocol: String,
}

impl CanonicalRecord {
    pub fn volume(&self, window: Window) -> f64 {
        match window {
            Window::H1 => self.volume_1h,
            Window::H6 => self.volume_6h,
            Window::H24 => self.volume_24h,
        }
    }

    pub fn transaction_count(&self, window: Window) -> u64 {
        match window {
            Window::H1 => self.transaction_count_1h,
            Window::H6 => self.transaction_count_6h,
            Window::H24 => self.transaction_count_24h,
        }
    }

    pub fn price_change(&self, window: Window) -> f64 {
        match window {
            Window::H1 => self.price_1hr_change,
            Window::H6 => self.price_6hr_change,
            Window::H24 => self.price_24hr_change,
        }
    }

    /// Cache key for this record
    pub fn cache_key(&self) -> String {
        cache_key(&self.token_address)
    }
}

/// Cache key for a token address
pub fn cache_key(token_address: &str) -> String {
    format!("token:{}", token_address)
}
