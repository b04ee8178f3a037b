//! Input normalisation for fields the fetching layer does not type strictly

use serde::{Deserialize, Deserializer};

/// Credit amounts as they may arrive from the booking API
#[derive(Deserialize)]
#[serde(untagged)]
#[allow(dead_code)]
enum RawCredits {
    Integer(i64),
    Float(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

/// Clamp a credit amount to the non-negative range
pub fn normalize_credits(credits: i64) -> i64 {
    credits.max(0)
}

/// Parse a credit amount from free text.
///
/// Fractional values are truncated. Anything that is not a finite,
/// non-negative number reads as 0.
pub fn parse_credits(text: &str) -> i64 {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return normalize_credits(value);
    }
    match text.parse::<f64>() {
        Ok(value) => credits_from_float(value),
        Err(_) => 0,
    }
}

fn credits_from_float(value: f64) -> i64 {
    if value.is_finite() && value > 0.0 {
        value.trunc() as i64
    } else {
        0
    }
}

/// Serde hook for `credits_required`-style fields: missing, null,
/// non-numeric and negative inputs all become 0
pub fn deserialize_credits<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawCredits>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawCredits::Integer(value)) => normalize_credits(value),
        Some(RawCredits::Float(value)) => credits_from_float(value),
        Some(RawCredits::Text(text)) => parse_credits(&text),
        Some(RawCredits::Other(_)) | None => 0,
    })
}
