//! GeckoTerminal client (secondary source).
//!
//! Endpoint: `{base}/networks/{network}/pools/{pool_address}`
//! The public API is aggressively rate limited and answers HTTP 429, which
//! is surfaced as [`FetchError::RateLimited`] so callers can back off.

use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::models::{PartialRecord, TxnCounts, Windowed};

use super::{de, normalize_base_url, FetchError, SourceError};

pub const SOURCE_NAME: &str = "geckoterminal";

#[derive(Debug, Deserialize)]
struct PoolResponse {
    data: PoolData,
}

#[derive(Debug, Deserialize)]
struct PoolData {
    attributes: PoolAttributes,
    #[serde(default)]
    relationships: Option<PoolRelationships>,
}

#[derive(Debug, Deserialize)]
struct PoolAttributes {
    name: Option<String>,
    #[serde(default, deserialize_with = "de::option_f64")]
    base_token_price_usd: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    market_cap_usd: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    reserve_in_usd: Option<f64>,
    #[serde(default)]
    volume_usd: GeckoWindows,
    #[serde(default)]
    transactions: GeckoTxnWindows,
    #[serde(default)]
    price_change_percentage: GeckoWindows,
}

#[derive(Debug, Default, Deserialize)]
struct GeckoWindows {
    #[serde(default, deserialize_with = "de::option_f64")]
    h1: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    h6: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    h24: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct GeckoTxnWindows {
    h1: Option<GeckoTxns>,
    h6: Option<GeckoTxns>,
    h24: Option<GeckoTxns>,
}

#[derive(Debug, Deserialize)]
struct GeckoTxns {
    #[serde(default, deserialize_with = "de::option_u64")]
    buys: Option<u64>,
    #[serde(default, deserialize_with = "de::option_u64")]
    sells: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PoolRelationships {
    base_token: Option<Relationship>,
    dex: Option<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    data: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    id: String,
}

impl From<GeckoWindows> for Windowed<f64> {
    fn from(w: GeckoWindows) -> Self {
        Windowed {
            h1: w.h1,
            h6: w.h6,
            h24: w.h24,
        }
    }
}

impl From<GeckoTxns> for TxnCounts {
    fn from(t: GeckoTxns) -> Self {
        TxnCounts {
            buys: t.buys,
            sells: t.sells,
        }
    }
}

fn relationship_id(rel: Option<Relationship>) -> Option<String> {
    rel.and_then(|r| r.data).map(|d| d.id)
}

/// Parses a pool body into a partial record.
///
/// Token ids look like `solana_<mint>`, so the `{network}_` prefix is
/// stripped to recover the address. The ticker is the first segment of the
/// pool name (`"BONK / SOL"` -> `"BONK"`). GeckoTerminal pools carry no
/// token display name.
pub fn parse_pool(body: &[u8], network: &str) -> Result<PartialRecord, SourceError> {
    let response: PoolResponse =
        serde_json::from_slice(body).map_err(|cause| SourceError::Malformed {
            source_name: SOURCE_NAME,
            cause,
        })?;

    let attributes = response.data.attributes;
    let (base_token, dex) = match response.data.relationships {
        Some(r) => (relationship_id(r.base_token), relationship_id(r.dex)),
        None => (None, None),
    };

    let prefix = format!("{}_", network);
    let token_address = base_token.map(|id| match id.strip_prefix(&prefix) {
        Some(address) => address.to_string(),
        None => id,
    });

    let token_ticker = attributes
        .name
        .as_deref()
        .and_then(|name| name.split('/').next())
        .map(|ticker| ticker.trim().to_string())
        .filter(|ticker| !ticker.is_empty());

    Ok(PartialRecord {
        token_address,
        token_name: None,
        token_ticker,
        price_usd: attributes.base_token_price_usd,
        market_cap_usd: attributes.market_cap_usd,
        liquidity_usd: attributes.reserve_in_usd,
        volume: attributes.volume_usd.into(),
        transactions: Windowed {
            h1: attributes.transactions.h1.map(Into::into),
            h6: attributes.transactions.h6.map(Into::into),
            h24: attributes.transactions.h24.map(Into::into),
        },
        price_change: attributes.price_change_percentage.into(),
        protocol: dex,
    })
}

#[derive(Debug, Clone)]
pub struct GeckoTerminalClient {
    client: Client,
    base_url: Url,
    network: String,
}

impl GeckoTerminalClient {
    pub fn new(base_url: &str, network: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
            network: network.to_string(),
        })
    }

    /// Single attempt. HTTP 429 maps to [`FetchError::RateLimited`], every
    /// other failure to a [`SourceError`].
    pub async fn pool(&self, pool_address: &str) -> Result<PartialRecord, FetchError> {
        let url = self
            .base_url
            .join(&format!("networks/{}/pools/{}", self.network, pool_address))
            .map_err(|cause| SourceError::Url {
                source_name: SOURCE_NAME,
                cause,
            })?;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|cause| SourceError::Request {
                source_name: SOURCE_NAME,
                cause,
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(FetchError::RateLimited {
                    source_name: SOURCE_NAME,
                })
            },
            status if !status.is_success() => {
                return Err(SourceError::Status {
                    source_name: SOURCE_NAME,
                    status,
                }
                .into())
            },
            _ => {},
        }

        let body = response.bytes().await.map_err(|cause| SourceError::Request {
            source_name: SOURCE_NAME,
            cause,
        })?;

        Ok(parse_pool(&body, &self.network)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": {
            "id": "solana_Pool1",
            "type": "pool",
            "attributes": {
                "base_token_price_usd": "0.0000234",
                "address": "Pool1",
                "name": "BONK / SOL",
                "market_cap_usd": null,
                "reserve_in_usd": "1234567.89",
                "price_change_percentage": { "m5": "0", "h1": "-0.42", "h6": "1.3", "h24": "7.77" },
                "transactions": {
                    "m5": { "buys": 1, "sells": 1, "buyers": 1, "sellers": 1 },
                    "h1": { "buys": 20, "sells": 22, "buyers": 10, "sellers": 11 },
                    "h6": { "buys": 120, "sells": 130 },
                    "h24": { "buys": 500, "sells": 480 }
                },
                "volume_usd": { "m5": "1", "h1": "1000.5", "h6": "6000", "h24": "24000.25" }
            },
            "relationships": {
                "base_token": { "data": { "id": "solana_Mint1", "type": "token" } },
                "quote_token": {
                    "data": {
                        "id": "solana_So11111111111111111111111111111111111111112",
                        "type": "token"
                    }
                },
                "dex": { "data": { "id": "raydium", "type": "dex" } }
            }
        }
    }"#;

    #[test]
    fn test_parse_pool() {
        let record = parse_pool(SAMPLE.as_bytes(), "solana").unwrap();

        assert_eq!(record.token_address.as_deref(), Some("Mint1"));
        assert_eq!(record.token_ticker.as_deref(), Some("BONK"));
        assert_eq!(record.token_name, None);
        assert_eq!(record.protocol.as_deref(), Some("raydium"));
        assert_eq!(record.price_usd, Some(0.0000234));
        assert_eq!(record.market_cap_usd, None);
        assert_eq!(record.liquidity_usd, Some(1234567.89));
        assert_eq!(record.volume.h24, Some(24000.25));
        assert_eq!(record.transactions.h6.and_then(|t| t.total()), Some(250));
        assert_eq!(record.price_change.h1, Some(-0.42));
    }

    #[test]
    fn test_foreign_network_prefix_is_kept() {
        let body = br#"{"data": {
            "attributes": { "name": "X" },
            "relationships": { "base_token": { "data": { "id": "eth_0xabc" } } }
        }}"#;
        let record = parse_pool(body, "solana").unwrap();
        assert_eq!(record.token_address.as_deref(), Some("eth_0xabc"));
        assert_eq!(record.protocol, None);
    }

    #[test]
    fn test_malformed_pool() {
        assert!(matches!(
            parse_pool(br#"{"errors":[{"status":"404","title":"Not Found"}]}"#, "solana"),
            Err(SourceError::Malformed { .. })
        ));
        assert!(matches!(
            parse_pool(br#"{"data":{"attributes":{"reserve_in_usd":"lots"}}}"#, "solana"),
            Err(SourceError::Malformed { .. })
        ));
    }
}
