//! Lenient numeric deserializers for upstream payloads.
//!
//! GeckoTerminal encodes most decimals as JSON strings, DexScreener mixes
//! numbers and strings. Both shapes and `null` are accepted; anything else
//! fails the whole body.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

pub fn option_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid number '{}'", s))),
    }
}

pub fn option_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match option_f64(deserializer)? {
        None => Ok(None),
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 => Ok(Some(n as u64)),
        Some(n) => Err(de::Error::custom(format!("invalid count {}", n))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "option_f64")]
        value: Option<f64>,
        #[serde(default, deserialize_with = "option_u64")]
        count: Option<u64>,
    }

    fn parse(json: &str) -> Result<Sample, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_accepts_numbers_strings_and_null() {
        let s = parse(r#"{"value": 1.5, "count": 3}"#).unwrap();
        assert_eq!((s.value, s.count), (Some(1.5), Some(3)));

        let s = parse(r#"{"value": "0.000123", "count": "42"}"#).unwrap();
        assert_eq!((s.value, s.count), (Some(0.000123), Some(42)));

        let s = parse(r#"{"value": null, "count": null}"#).unwrap();
        assert_eq!((s.value, s.count), (None, None));

        let s = parse(r#"{}"#).unwrap();
        assert_eq!((s.value, s.count), (None, None));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse(r#"{"value": "abc"}"#).is_err());
        assert!(parse(r#"{"value": true}"#).is_err());
        assert!(parse(r#"{"count": -1}"#).is_err());
        assert!(parse(r#"{"count": 1.5}"#).is_err());
    }
}
