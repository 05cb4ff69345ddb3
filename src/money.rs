//! Monetary normalization shared by the models and the amortization engine.
//!
//! Every amount in the crate is a [`Decimal`]. Values coming from loosely
//! shaped records go through [`coerce`], and the engine reads them through
//! [`non_negative`], so malformed input degrades to zero instead of failing.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Number of decimal places kept for currency amounts.
pub const CENT_PLACES: u32 = 2;

/// Tolerance used when matching two amounts that should be the same payment.
pub const MATCH_TOLERANCE: Decimal = dec!(0.01);

/// Rounds to whole cents, halves away from zero (`0.125 -> 0.13`).
#[inline]
#[must_use]
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENT_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Reads an optional amount as a non-negative decimal.
///
/// Absent and negative values become zero.
#[inline]
#[must_use]
pub fn non_negative(value: Option<Decimal>) -> Decimal {
    value.map_or(Decimal::ZERO, |amount| amount.max(Decimal::ZERO))
}

/// Returns `true` if the value is present and strictly positive.
#[inline]
#[must_use]
pub fn is_positive(value: Option<Decimal>) -> bool {
    value.is_some_and(|amount| amount > Decimal::ZERO)
}

/// Returns `true` if `a` and `b` differ by at most [`MATCH_TOLERANCE`].
#[inline]
#[must_use]
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MATCH_TOLERANCE
}

/// Converts a raw JSON value into a decimal if it looks numeric.
///
/// Numbers and numeric strings (plain or scientific notation) are
/// accepted; everything else yields `None`.
pub(crate) fn coerce(value: &serde_json::Value) -> Option<Decimal> {
    match *value {
        serde_json::Value::Number(ref number) => parse_decimal(&number.to_string()),
        serde_json::Value::String(ref text) => parse_decimal(text.trim()),
        serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Array(_)
        | serde_json::Value::Object(_) => None,
    }
}

/// Parses plain or scientific decimal notation.
fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_cents_half_away_from_zero() {
        assert_eq!(round_cents(dec!(0.125)), dec!(0.13));
        assert_eq!(round_cents(dec!(2.675)), dec!(2.68));
        assert_eq!(round_cents(dec!(-0.125)), dec!(-0.13));
        assert_eq!(round_cents(dec!(860.664)), dec!(860.66));
        assert_eq!(round_cents(dec!(100)), dec!(100.00));
    }

    #[test]
    fn non_negative_clamps() {
        assert_eq!(non_negative(None), Decimal::ZERO);
        assert_eq!(non_negative(Some(dec!(-5))), Decimal::ZERO);
        assert_eq!(non_negative(Some(dec!(12.5))), dec!(12.5));
    }

    #[test]
    fn is_positive_rejects_zero() {
        assert!(!is_positive(None));
        assert!(!is_positive(Some(Decimal::ZERO)));
        assert!(is_positive(Some(dec!(0.01))));
    }

    #[test]
    fn approx_eq_within_a_cent() {
        assert!(approx_eq(dec!(100.00), dec!(100.01)));
        assert!(approx_eq(dec!(100.01), dec!(100.00)));
        assert!(!approx_eq(dec!(100.00), dec!(100.02)));
    }

    #[test]
    fn coerce_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce(&json!(1200)), Some(dec!(1200)));
        assert_eq!(coerce(&json!(4.5)), Some(dec!(4.5)));
        assert_eq!(coerce(&json!(" 99.90 ")), Some(dec!(99.90)));
        assert_eq!(coerce(&json!("1e3")), Some(dec!(1000)));
    }

    #[test]
    fn coerce_rejects_non_numeric() {
        assert_eq!(coerce(&json!("")), None);
        assert_eq!(coerce(&json!("abc")), None);
        assert_eq!(coerce(&json!(null)), None);
        assert_eq!(coerce(&json!(true)), None);
        assert_eq!(coerce(&json!({"a": 1})), None);
    }
}
