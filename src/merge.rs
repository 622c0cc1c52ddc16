//! Field-level reconciliation of the two upstream sources.
//!
//! Every output field independently takes the primary (DexScreener) value
//! unless it is "falsy" (missing, zero, NaN or empty), in which case the
//! secondary (GeckoTerminal) value is used. A record can therefore be
//! primary-sourced for price and secondary-sourced for liquidity.
//!
//! A legitimately zero primary value (e.g. no transactions in the last
//! hour) is indistinguishable from a missing one and is overridden by the
//! secondary source whenever the secondary reports the field.

use thiserror::Error;

use crate::models::{CanonicalRecord, PartialRecord, TxnCounts, Window, Windowed};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("field '{0}' missing from both sources")]
    MissingField(&'static str),
    #[error("field '{0}' is not a finite number")]
    NonFinite(&'static str),
}

/// Values that count as absent for fallback purposes.
trait Falsy {
    fn is_falsy(&self) -> bool;
}

impl Falsy for f64 {
    fn is_falsy(&self) -> bool {
        *self == 0.0 || self.is_nan()
    }
}

impl Falsy for u64 {
    fn is_falsy(&self) -> bool {
        *self == 0
    }
}

impl Falsy for String {
    fn is_falsy(&self) -> bool {
        self.trim().is_empty()
    }
}

/// Primary unless falsy, then secondary. If the secondary did not report the
/// field at all, a falsy-but-present primary value is kept.
fn fallback<T: Falsy>(
    field: &'static str,
    primary: Option<T>,
    secondary: Option<T>,
) -> Result<T, MergeError> {
    match (primary, secondary) {
        (Some(p), _) if !p.is_falsy() => Ok(p),
        (_, Some(s)) => Ok(s),
        (Some(p), None) => Ok(p),
        (None, None) => Err(MergeError::MissingField(field)),
    }
}

fn number(
    field: &'static str,
    primary: Option<f64>,
    secondary: Option<f64>,
) -> Result<f64, MergeError> {
    let value = fallback(field, primary, secondary)?;
    if !value.is_finite() {
        return Err(MergeError::NonFinite(field));
    }
    Ok(value)
}

fn text(
    field: &'static str,
    primary: &Option<String>,
    secondary: &Option<String>,
) -> Result<String, MergeError> {
    let value = fallback(field, primary.clone(), secondary.clone())?;
    if value.is_falsy() {
        return Err(MergeError::MissingField(field));
    }
    Ok(value)
}

fn windowed(
    fields: [&'static str; 3],
    primary: &Windowed<f64>,
    secondary: &Windowed<f64>,
) -> Result<[f64; 3], MergeError> {
    let mut out = [0.0; 3];
    for (i, window) in Window::ALL.into_iter().enumerate() {
        out[i] = number(fields[i], primary.get(window), secondary.get(window))?;
    }
    Ok(out)
}

fn transactions(
    primary: &Windowed<TxnCounts>,
    secondary: &Windowed<TxnCounts>,
) -> Result<[u64; 3], MergeError> {
    const FIELDS: [&str; 3] = [
        "transaction_count_1h",
        "transaction_count_6h",
        "transaction_count_24h",
    ];

    let mut out = [0; 3];
    for (i, window) in Window::ALL.into_iter().enumerate() {
        // Buys and sells are summed per source before the fallback is applied
        let p = primary.get(window).and_then(|t| t.total());
        let s = secondary.get(window).and_then(|t| t.total());
        out[i] = fallback(FIELDS[i], p, s)?;
    }
    Ok(out)
}

/// Combines one record from each source into the canonical record.
///
/// Pure and deterministic. Fails with [`MergeError`] when a field is absent
/// from both sources, a number is not finite, or a text field ends up empty.
pub fn merge(
    primary: &PartialRecord,
    secondary: &PartialRecord,
) -> Result<CanonicalRecord, MergeError> {
    let [volume_1h, volume_6h, volume_24h] = windowed(
        ["volume_1h", "volume_6h", "volume_24h"],
        &primary.volume,
        &secondary.volume,
    )?;
    let [price_1hr_change, price_6hr_change, price_24hr_change] = windowed(
        ["price_1hr_change", "price_6hr_change", "price_24hr_change"],
        &primary.price_change,
        &secondary.price_change,
    )?;
    let [transaction_count_1h, transaction_count_6h, transaction_count_24h] =
        transactions(&primary.transactions, &secondary.transactions)?;

    Ok(CanonicalRecord {
        token_address: text("token_address", &primary.token_address, &secondary.token_address)?,
        token_name: text("token_name", &primary.token_name, &secondary.token_name)?,
        token_ticker: text("token_ticker", &primary.token_ticker, &secondary.token_ticker)?,
        price_usd: number("price_usd", primary.price_usd, secondary.price_usd)?,
        market_cap_usd: number("market_cap_usd", primary.market_cap_usd, secondary.market_cap_usd)?,
        volume_1h,
        volume_6h,
        volume_24h,
        liquidity_usd: number("liquidity_usd", primary.liquidity_usd, secondary.liquidity_usd)?,
        transaction_count_1h,
        transaction_count_6h,
        transaction_count_24h,
        price_1hr_change,
        price_6hr_change,
        price_24hr_change,
        protocol: text("protocol", &primary.protocol, &secondary.protocol)?,
    })
}
