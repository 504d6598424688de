//! Quotation Model
//!
//! The pre-confirmation estimate. One row per booking, upserted, never
//! deleted. Pre-discount figures are preserved so a discount can be removed
//! and for audit display.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quotation entity (1:1 by booking id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    pub booking_id: u64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    /// Active discount code, if any. At most one code at a time.
    pub discount_code_id: Option<String>,
    pub discount_amount: Option<Decimal>,
    /// Pre-discount figures, untouched by apply/remove
    pub original_subtotal: Decimal,
    pub original_tax: Decimal,
    pub original_total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quotation {
    /// Fresh quotation with no discount; original figures mirror the base
    pub fn new(
        booking_id: u64,
        subtotal: Decimal,
        tax: Decimal,
        total: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            booking_id,
            subtotal,
            tax,
            total,
            discount_code_id: None,
            discount_amount: None,
            original_subtotal: subtotal,
            original_tax: tax,
            original_total: total,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_discount(&self) -> bool {
        self.discount_code_id.is_some()
    }
}
