//! Permissive `deserialize_with` helpers for loosely shaped records.
//!
//! Records written by older versions may carry numbers as strings, empty
//! strings for unset fields, or full ISO date-times where a calendar date
//! is expected. These helpers normalize such values at construction time.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive as _;
use serde::{Deserialize as _, Deserializer};

use crate::money;

/// Length of a `YYYY-MM-DD` prefix.
const DATE_LEN: usize = 10;

/// Deserializes an optional amount; non-numeric input becomes `None`.
pub(crate) fn decimal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(money::coerce))
}

/// Deserializes an optional count, truncating fractions and clamping
/// negatives to zero; non-numeric input becomes `None`.
pub(crate) fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let amount = decimal(deserializer)?;
    Ok(amount.and_then(|value| value.trunc().max(Decimal::ZERO).to_u32()))
}

/// Deserializes an optional calendar date; unparseable input becomes `None`.
pub(crate) fn opt_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(parse_date))
}

/// Deserializes a required calendar date, accepting ISO date-times.
pub(crate) fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw:?}")))
}

/// Parses `YYYY-MM-DD`, ignoring any time-of-day suffix.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let prefix = trimmed.get(..DATE_LEN).unwrap_or(trimmed);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
