//! Booking Model
//!
//! The aggregate root of the service lifecycle. Status is a closed enum with
//! an explicit transition table; illegal transitions are rejected with an
//! error naming both states, never silently ignored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Booking status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Received,
    Quoted,
    Confirmed,
    Invoiced,
    Paid,
    Cancelled,
}

impl BookingStatus {
    /// Legal next states from the current state.
    ///
    /// `Quoted -> Quoted` and `Invoiced -> Invoiced` are deliberate:
    /// quotations may be re-edited before confirmation and invoices may be
    /// re-finalized before capture.
    pub fn allowed_transitions(self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Received => &[Quoted, Cancelled],
            Quoted => &[Quoted, Confirmed, Cancelled],
            Confirmed => &[Invoiced, Cancelled],
            Invoiced => &[Invoiced, Paid, Cancelled],
            // Terminal states
            Paid => &[],
            Cancelled => &[],
        }
    }

    /// Check whether `self -> to` is a legal transition
    pub fn check_transition(self, to: BookingStatus) -> Result<(), TransitionError> {
        if self.allowed_transitions().contains(&to) {
            Ok(())
        } else {
            Err(TransitionError { from: self, to })
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Received => "RECEIVED",
            BookingStatus::Quoted => "QUOTED",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Invoiced => "INVOICED",
            BookingStatus::Paid => "PAID",
            BookingStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Illegal state transition, naming both ends
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("illegal transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

/// Item size category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemSize {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

/// An item to be picked up / delivered. Pure value data owned by the booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingItem {
    pub name: String,
    pub size: ItemSize,
    pub quantity: i32,
    pub photo_url: Option<String>,
    pub description: Option<String>,
}

/// Address block for pickup or delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

/// Booking entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: u64,
    pub status: BookingStatus,
    /// Email of the owning customer (unique customer key)
    pub customer_email: String,
    pub pickup_address: Address,
    pub delivery_address: Option<Address>,
    pub delivery_required: bool,
    pub items: Vec<BookingItem>,
    /// Requested pickup time
    pub preferred_datetime: DateTime<Utc>,
    /// Pickup time minus the free-cancellation window; always strictly
    /// before `preferred_datetime`
    pub free_cancellation_deadline: DateTime<Utc>,
    /// Set only when the booking is cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Set only on fee-bearing cancellation
    pub cancellation_fee: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
