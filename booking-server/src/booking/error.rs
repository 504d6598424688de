//! Domain error type for the booking core
//!
//! One taxonomy across all services so callers can distinguish retryable
//! failures (provider network, lost conditional update) from terminal ones
//! (validation, declined card, already cancelled).

use crate::db::StorageError;
use crate::money::MoneyError;
use crate::payments::ProviderError;
use shared::models::TransitionError;
use thiserror::Error;

/// Booking core errors
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(u64),

    #[error("Quotation not found for booking {0}")]
    QuotationNotFound(u64),

    #[error("Payment not found for booking {0}")]
    PaymentNotFound(u64),

    #[error("Discount code not found: {0}")]
    DiscountNotFound(String),

    #[error("Discount code is inactive: {0}")]
    DiscountInactive(String),

    #[error("Discount code is not yet valid: {0}")]
    DiscountNotYetValid(String),

    #[error("Discount code has expired: {0}")]
    DiscountExpired(String),

    #[error("A discount code is already applied to booking {0}")]
    DiscountAlreadyApplied(u64),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Booking already cancelled: {0}")]
    AlreadyCancelled(u64),

    #[error("Pickup time has passed for booking {0}")]
    PickupTimePassed(u64),

    #[error("No stored payment method for booking {0}")]
    MissingPaymentMethod(u64),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl BookingError {
    /// Whether the caller can meaningfully retry the whole operation
    pub fn is_retryable(&self) -> bool {
        match self {
            BookingError::Provider(e) => e.is_retryable(),
            BookingError::Conflict(_) | BookingError::Storage(_) => true,
            _ => false,
        }
    }
}

impl From<StorageError> for BookingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::BookingNotFound(id) => BookingError::BookingNotFound(id),
            StorageError::StatusConflict {
                booking_id,
                current,
            } => BookingError::Conflict(format!(
                "booking {booking_id} status changed concurrently (now {current})"
            )),
            other => BookingError::Storage(other),
        }
    }
}

impl From<MoneyError> for BookingError {
    fn from(err: MoneyError) -> Self {
        BookingError::Validation(err.to_string())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
