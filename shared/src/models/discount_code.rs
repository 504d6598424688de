//! Discount Code Model
//!
//! Read-only from the booking core's perspective; lifecycle is managed by
//! admin tooling. Date windows are date-only and interpreted against a fixed
//! UTC-8 day boundary by the discount engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discount kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    FixedAmount,
    Percentage,
}

/// Discount code entity, keyed by its unique code string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCode {
    pub code: String,
    pub discount_type: DiscountType,
    /// Fixed amount in currency units, or percentage points (e.g. 20 = 20%)
    pub value: Decimal,
    pub is_active: bool,
    /// First valid calendar day, inclusive
    pub starts_at: Option<NaiveDate>,
    /// Last valid calendar day, inclusive
    pub expires_at: Option<NaiveDate>,
}
