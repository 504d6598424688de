//! Money calculation utilities using rust_decimal for precision
//!
//! All monetary fields stay `Decimal` end to end; binary floating point
//! never touches a persistence or provider boundary. Provider APIs take
//! integer minor units, converted here.

use rust_decimal::prelude::*;
use thiserror::Error;


/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Tax rate used when a quotation has a zero subtotal (0.12)
pub const FALLBACK_TAX_RATE: Decimal = Decimal::from_parts(12, 0, 0, false, 2);

/// Maximum allowed amount for any single monetary field ($1,000,000)
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Money validation errors
#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: Decimal },

    #[error("{field} exceeds maximum allowed ({MAX_AMOUNT}), got {value}")]
    TooLarge { field: &'static str, value: Decimal },

    #[error("total {total} does not match subtotal {subtotal} + tax {tax}")]
    TotalMismatch {
        subtotal: Decimal,
        tax: Decimal,
        total: Decimal,
    },

    #[error("amount {0} cannot be represented in minor units")]
    MinorUnitOverflow(Decimal),
}

/// Round to 2 decimal places, midpoint away from zero
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Multiply an amount by a rate (e.g. tax rate), rounded to the cent
#[inline]
pub fn multiply_by_rate(amount: Decimal, rate: Decimal) -> Decimal {
    round_money(amount * rate)
}

/// Approximate equality within [`MONEY_TOLERANCE`], boundary inclusive
#[inline]
pub fn approx_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}

/// Convert a decimal amount to integer minor units ($70.56 -> 7056)
pub fn to_minor_units(value: Decimal) -> Result<i64, MoneyError> {
    let scaled = round_money(value) * Decimal::ONE_HUNDRED;
    scaled
        .to_i64()
        .ok_or(MoneyError::MinorUnitOverflow(value))
}

/// Convert integer minor units back to a decimal amount (7056 -> 70.56)
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, DECIMAL_PLACES)
}

/// Validate that a single amount is within [0, MAX_AMOUNT]
pub fn validate_amount(value: Decimal, field: &'static str) -> Result<(), MoneyError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MoneyError::Negative { field, value });
    }
    if value > MAX_AMOUNT {
        return Err(MoneyError::TooLarge { field, value });
    }
    Ok(())
}

/// Validate a subtotal/tax/total triple: non-negative, bounded, and
/// `total == subtotal + tax` within tolerance
pub fn validate_figures(
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
) -> Result<(), MoneyError> {
    validate_amount(subtotal, "subtotal")?;
    validate_amount(tax, "tax")?;
    validate_amount(total, "total")?;
    if !approx_eq(subtotal + tax, total) {
        return Err(MoneyError::TotalMismatch {
            subtotal,
            tax,
            total,
        });
    }
    Ok(())
}
