use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::CanonicalRecord;

/// Time horizon selecting which volume / transaction / price-change
/// fields a view exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "6h")]
    H6,
    #[serde(rename = "24h")]
    H24,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::H1, Window::H6, Window::H24];

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::H1 => "1h",
            Window::H6 => "6h",
            Window::H24 => "24h",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Window {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Window::H1),
            "6h" => Ok(Window::H6),
            "24h" => Ok(Window::H24),
            other => Err(InvalidParameter::Window(other.to_string())),
        }
    }
}

/// Numeric field a view is sorted by (always descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Volume,
    PriceChange,
    MarketCapUsd,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Volume => "volume",
            SortKey::PriceChange => "price_change",
            SortKey::MarketCapUsd => "market_cap_usd",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = InvalidParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volume" => Ok(SortKey::Volume),
            "price_change" => Ok(SortKey::PriceChange),
            "market_cap_usd" => Ok(SortKey::MarketCapUsd),
            other => Err(InvalidParameter::SortKey(other.to_string())),
        }
    }
}

/// A window or sort selector that is not one of the recognized values,
/// or a query string that does not decode into one selector of each.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParameter {
    #[error("malformed query: {0}")]
    Query(String),
    #[error("invalid window '{0}', expected one of 1h, 6h, 24h")]
    Window(String),
    #[error("invalid sort key '{0}', expected one of volume, price_change, market_cap_usd")]
    SortKey(String),
}

/// A [`CanonicalRecord`] projected onto a single window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub token_address: String,
    pub token_name: String,
    pub token_ticker: String,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub volume: f64,
    pub liquidity_usd: f64,
    pub transaction_count: u64,
    pub price_change: f64,
    pub protocol: String,
}

impl ViewRecord {
    pub fn project(record: &CanonicalRecord, window: Window) -> Self {
        Self {
            token_address: record.token_address.clone(),
            token_name: record.token_name.clone(),
            token_ticker: record.token_ticker.clone(),
            price_usd: record.price_usd,
            market_cap_usd: record.market_cap_usd,
            volume: record.volume(window),
            liquidity_usd: record.liquidity_usd,
            transaction_count: record.transaction_count(window),
            price_change: record.price_change(window),
            protocol: record.protocol.clone(),
        }
    }

    pub fn sort_value(&self, key: SortKey) -> f64 {
        match key {
            SortKey::Volume => self.volume,
            SortKey::PriceChange => self.price_change,
            SortKey::MarketCapUsd => self.market_cap_usd,
        }
    }
}
