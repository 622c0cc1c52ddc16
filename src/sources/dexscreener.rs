//! DexScreener client (primary source).
//!
//! Endpoint: `{base}/latest/dex/tokens/{token_address}`
//! Returns every trading pair for the token; the first pair is used.

use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::models::{PartialRecord, TxnCounts, Windowed};

use super::{de, normalize_base_url, FetchError, SourceError};

pub const SOURCE_NAME: &str = "dexscreener";

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    dex_id: Option<String>,
    base_token: Option<BaseToken>,
    #[serde(default, deserialize_with = "de::option_f64")]
    price_usd: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    market_cap: Option<f64>,
    #[serde(default)]
    volume: DexWindows,
    #[serde(default)]
    liquidity: Option<DexLiquidity>,
    #[serde(default)]
    txns: DexTxnWindows,
    #[serde(default)]
    price_change: DexWindows,
}

#[derive(Debug, Deserialize)]
struct BaseToken {
    address: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DexWindows {
    #[serde(default, deserialize_with = "de::option_f64")]
    h1: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    h6: Option<f64>,
    #[serde(default, deserialize_with = "de::option_f64")]
    h24: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DexLiquidity {
    #[serde(default, deserialize_with = "de::option_f64")]
    usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct DexTxnWindows {
    h1: Option<DexTxns>,
    h6: Option<DexTxns>,
    h24: Option<DexTxns>,
}

#[derive(Debug, Deserialize)]
struct DexTxns {
    #[serde(default, deserialize_with = "de::option_u64")]
    buys: Option<u64>,
    #[serde(default, deserialize_with = "de::option_u64")]
    sells: Option<u64>,
}

impl From<DexTxns> for TxnCounts {
    fn from(t: DexTxns) -> Self {
        TxnCounts {
            buys: t.buys,
            sells: t.sells,
        }
    }
}

impl From<DexWindows> for Windowed<f64> {
    fn from(w: DexWindows) -> Self {
        Windowed {
            h1: w.h1,
            h6: w.h6,
            h24: w.h24,
        }
    }
}

impl From<DexPair> for PartialRecord {
    fn from(pair: DexPair) -> Self {
        let (token_address, token_name, token_ticker) = match pair.base_token {
            Some(t) => (t.address, t.name, t.symbol),
            None => (None, None, None),
        };

        PartialRecord {
            token_address,
            token_name,
            token_ticker,
            price_usd: pair.price_usd,
            market_cap_usd: pair.market_cap,
            liquidity_usd: pair.liquidity.and_then(|l| l.usd),
            volume: pair.volume.into(),
            transactions: Windowed {
                h1: pair.txns.h1.map(Into::into),
                h6: pair.txns.h6.map(Into::into),
                h24: pair.txns.h24.map(Into::into),
            },
            price_change: pair.price_change.into(),
            protocol: pair.dex_id,
        }
    }
}

/// Parses a token-pairs body into the first pair's partial record.
pub fn parse_token_pairs(body: &[u8]) -> Result<PartialRecord, SourceError> {
    let response: TokenPairsResponse =
        serde_json::from_slice(body).map_err(|cause| SourceError::Malformed {
            source_name: SOURCE_NAME,
            cause,
        })?;

    response
        .pairs
        .and_then(|pairs| pairs.into_iter().next())
        .map(PartialRecord::from)
        .ok_or(SourceError::Empty {
            source_name: SOURCE_NAME,
        })
}

#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    client: Client,
    base_url: Url,
}

impl DexScreenerClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// Single attempt, no retry. Every failure (including HTTP 429) is a
    /// [`SourceError`].
    pub async fn token_pairs(&self, token_address: &str) -> Result<PartialRecord, FetchError> {
        let url = self
            .base_url
            .join(&format!("latest/dex/tokens/{}", token_address))
            .map_err(|e| SourceError::Url {
                source_name: SOURCE_NAME,
                cause: e,
            })?;

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|cause| SourceError::Request {
                source_name: SOURCE_NAME,
                cause,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                source_name: SOURCE_NAME,
                status,
            }
            .into());
        }

        let body = response.bytes().await.map_err(|cause| SourceError::Request {
            source_name: SOURCE_NAME,
            cause,
        })?;

        Ok(parse_token_pairs(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "solana",
                "dexId": "raydium",
                "pairAddress": "PairAddr1",
                "baseToken": { "address": "Mint1", "name": "Bonk", "symbol": "Bonk" },
                "quoteToken": {
                    "address": "So11111111111111111111111111111111111111112",
                    "name": "Wrapped SOL",
                    "symbol": "SOL"
                },
                "priceNative": "0.0000001",
                "priceUsd": "0.00002345",
                "txns": {
                    "m5": { "buys": 1, "sells": 2 },
                    "h1": { "buys": 10, "sells": 5 },
                    "h6": { "buys": 60, "sells": 40 },
                    "h24": { "buys": 300, "sells": 200 }
                },
                "volume": { "h24": 123456.7, "h6": 2345.6, "h1": 345.6, "m5": 1.2 },
                "priceChange": { "h1": -0.5, "h6": 1.2, "h24": 12 },
                "liquidity": { "usd": 98765.4, "base": 1, "quote": 2 },
                "fdv": 1999999,
                "marketCap": 1888888
            },
            {
                "dexId": "orca",
                "baseToken": { "address": "Mint1", "name": "Bonk", "symbol": "Bonk" },
                "priceUsd": "1"
            }
        ]
    }"#;

    #[test]
    fn test_first_pair_is_used() {
        let record = parse_token_pairs(SAMPLE.as_bytes()).unwrap();

        assert_eq!(record.token_address.as_deref(), Some("Mint1"));
        assert_eq!(record.token_ticker.as_deref(), Some("Bonk"));
        assert_eq!(record.protocol.as_deref(), Some("raydium"));
        assert_eq!(record.price_usd, Some(0.00002345));
        assert_eq!(record.market_cap_usd, Some(1888888.0));
        assert_eq!(record.liquidity_usd, Some(98765.4));
        assert_eq!(record.volume.h6, Some(2345.6));
        assert_eq!(record.transactions.h1.and_then(|t| t.total()), Some(15));
        assert_eq!(record.price_change.h24, Some(12.0));
    }

    #[test]
    fn test_missing_sections_become_none() {
        let body = br#"{"pairs":[{
            "dexId": "meteora",
            "baseToken": { "address": "M", "name": "N", "symbol": "S" }
        }]}"#;
        let record = parse_token_pairs(body).unwrap();

        assert_eq!(record.price_usd, None);
        assert_eq!(record.liquidity_usd, None);
        assert_eq!(record.volume, Windowed::default());
        assert_eq!(record.transactions.h24, None);
    }

    #[test]
    fn test_no_pairs_is_an_error() {
        assert!(matches!(
            parse_token_pairs(br#"{"schemaVersion":"1.0.0","pairs":null}"#),
            Err(SourceError::Empty { .. })
        ));
        assert!(matches!(
            parse_token_pairs(br#"{"pairs":[]}"#),
            Err(SourceError::Empty { .. })
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_token_pairs(b"<html>bad gateway</html>"),
            Err(SourceError::Malformed { .. })
        ));
        assert!(matches!(
            parse_token_pairs(br#"{"pairs":[{"priceUsd":"not-a-number"}]}"#),
            Err(SourceError::Malformed { .. })
        ));
    }
}
