//! Payment Model
//!
//! The final-invoice and payment-provider-linkage record, distinct from the
//! quotation: the invoiced amount may differ from the estimate. Created
//! lazily the first time a card is authorized, then updated at invoice
//! finalization, at capture, and by provider webhook events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment lifecycle status.
///
/// Mirrors the provider lifecycle up to capture; after a successful capture
/// the provider's own terminal status string is stored verbatim via
/// `Other`. Serialized as a plain string either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Authorized,
    ReadyForPayment,
    RequiresConfirmation,
    CancellationFeeCharged,
    /// Provider-native status (e.g. "succeeded")
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Authorized => "AUTHORIZED",
            PaymentStatus::ReadyForPayment => "READY_FOR_PAYMENT",
            PaymentStatus::RequiresConfirmation => "REQUIRES_CONFIRMATION",
            PaymentStatus::CancellationFeeCharged => "CANCELLATION_FEE_CHARGED",
            PaymentStatus::Other(s) => s,
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        match s {
            "PENDING" => PaymentStatus::Pending,
            "AUTHORIZED" => PaymentStatus::Authorized,
            "READY_FOR_PAYMENT" => PaymentStatus::ReadyForPayment,
            "REQUIRES_CONFIRMATION" => PaymentStatus::RequiresConfirmation,
            "CANCELLATION_FEE_CHARGED" => PaymentStatus::CancellationFeeCharged,
            other => PaymentStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(PaymentStatus::from(s.as_str()))
    }
}

/// Payment entity (1:1 by booking id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub booking_id: u64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    /// ISO currency code, e.g. "CAD"
    pub currency: String,
    pub provider_customer_id: Option<String>,
    pub provider_payment_method_id: Option<String>,
    pub provider_payment_intent_id: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Empty record created when a card is first authorized
    pub fn new(booking_id: u64, currency: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            booking_id,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            currency: currency.into(),
            provider_customer_id: None,
            provider_payment_method_id: None,
            provider_payment_intent_id: None,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// True once both provider ids required for charging are present
    pub fn has_payment_method(&self) -> bool {
        self.provider_customer_id.is_some() && self.provider_payment_method_id.is_some()
    }
}
