//! Booking intake and lifecycle service
//!
//! Owns booking creation (with customer upsert), quotation upserts, the
//! customer-facing confirmation step, and the admin status override. Every
//! mutation is a single write transaction that re-validates the current
//! status before writing.

use chrono::Duration;
use tracing::info;

use shared::models::{
    Address, Booking, BookingItem, BookingStatus, Customer, PaymentRecord, Quotation,
};
use shared::util::now;

use crate::db::BookingStore;
use crate::money;

use super::{BookingError, BookingResult};

/// Intake request, already syntactically validated at the API layer
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub pickup_address: Address,
    pub delivery_address: Option<Address>,
    pub delivery_required: bool,
    pub items: Vec<BookingItem>,
    pub preferred_datetime: chrono::DateTime<chrono::Utc>,
}

/// Quotation figures entered by an admin
#[derive(Debug, Clone)]
pub struct QuoteFigures {
    pub subtotal: rust_decimal::Decimal,
    pub tax: rust_decimal::Decimal,
    pub total: rust_decimal::Decimal,
}

/// Full read model for a booking
#[derive(Debug, Clone, serde::Serialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub quotation: Option<Quotation>,
    pub payment: Option<PaymentRecord>,
}

/// Booking intake and lifecycle
#[derive(Clone)]
pub struct BookingService {
    store: BookingStore,
    free_cancellation_hours: i64,
}

impl BookingService {
    pub fn new(store: BookingStore, free_cancellation_hours: i64) -> Self {
        Self {
            store,
            free_cancellation_hours,
        }
    }

    /// Create a booking in `RECEIVED`, upserting the customer by email.
    /// The free-cancellation deadline is derived from the pickup time here
    /// and never recomputed afterwards.
    pub fn create_booking(&self, request: NewBooking) -> BookingResult<Booking> {
        if request.items.is_empty() {
            return Err(BookingError::Validation(
                "a booking must contain at least one item".to_string(),
            ));
        }
        if request.items.iter().any(|item| item.quantity <= 0) {
            return Err(BookingError::Validation(
                "item quantity must be positive".to_string(),
            ));
        }
        let now_ts = now();
        if request.preferred_datetime <= now_ts {
            return Err(BookingError::Validation(
                "pickup time must be in the future".to_string(),
            ));
        }
        if request.delivery_required && request.delivery_address.is_none() {
            return Err(BookingError::Validation(
                "delivery address is required when delivery is requested".to_string(),
            ));
        }

        let txn = self.store.begin_write()?;
        let booking = {
            // Upsert customer, preserving the original created_at
            let customer = match self.store.load_customer(&txn, &request.customer_email)? {
                Some(existing) => Customer {
                    name: request.customer_name.clone(),
                    phone: request.customer_phone.clone(),
                    updated_at: now_ts,
                    ..existing
                },
                None => Customer {
                    email: request.customer_email.clone(),
                    name: request.customer_name.clone(),
                    phone: request.customer_phone.clone(),
                    created_at: now_ts,
                    updated_at: now_ts,
                },
            };
            self.store.store_customer(&txn, &customer)?;

            let id = self.store.next_booking_id(&txn)?;
            let booking = Booking {
                id,
                status: BookingStatus::Received,
                customer_email: request.customer_email,
                pickup_address: request.pickup_address,
                delivery_address: request.delivery_address,
                delivery_required: request.delivery_required,
                items: request.items,
                preferred_datetime: request.preferred_datetime,
                free_cancellation_deadline: request.preferred_datetime
                    - Duration::hours(self.free_cancellation_hours),
                cancelled_at: None,
                cancellation_fee: None,
                created_at: now_ts,
                updated_at: now_ts,
            };
            self.store.store_booking(&txn, &booking)?;
            booking
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id = booking.id, "Booking created");
        Ok(booking)
    }

    pub fn get_booking(&self, booking_id: u64) -> BookingResult<BookingDetails> {
        let booking = self
            .store
            .get_booking(booking_id)?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        let quotation = self.store.get_quotation(booking_id)?;
        let payment = self.store.get_payment(booking_id)?;
        Ok(BookingDetails {
            booking,
            quotation,
            payment,
        })
    }

    /// Create or replace the quotation and move the booking to `QUOTED`.
    /// A re-quote resets the pre-discount figures and drops any applied
    /// discount: the code must be re-applied against the new figures.
    pub fn upsert_quotation(
        &self,
        booking_id: u64,
        figures: QuoteFigures,
    ) -> BookingResult<(Booking, Quotation)> {
        money::validate_figures(figures.subtotal, figures.tax, figures.total)?;
        let now_ts = now();

        let txn = self.store.begin_write()?;
        let (booking, quotation) = {
            let booking = self.store.transition_status(
                &txn,
                booking_id,
                &[BookingStatus::Received, BookingStatus::Quoted],
                BookingStatus::Quoted,
                now_ts,
            )?;

            let quotation = match self.store.load_quotation(&txn, booking_id)? {
                Some(existing) => Quotation {
                    subtotal: figures.subtotal,
                    tax: figures.tax,
                    total: figures.total,
                    discount_code_id: None,
                    discount_amount: None,
                    original_subtotal: figures.subtotal,
                    original_tax: figures.tax,
                    original_total: figures.total,
                    updated_at: now_ts,
                    ..existing
                },
                None => Quotation::new(
                    booking_id,
                    figures.subtotal,
                    figures.tax,
                    figures.total,
                    now_ts,
                ),
            };
            self.store.store_quotation(&txn, &quotation)?;
            (booking, quotation)
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, total = %quotation.total, "Quotation stored");
        Ok((booking, quotation))
    }

    /// Customer accepts the quotation: `QUOTED -> CONFIRMED`. Requires an
    /// authorized payment method so the invoice can be charged later.
    pub fn confirm_booking(&self, booking_id: u64) -> BookingResult<Booking> {
        let txn = self.store.begin_write()?;
        let has_card = self
            .store
            .load_payment(&txn, booking_id)?
            .is_some_and(|p| p.has_payment_method());
        if !has_card {
            return Err(BookingError::MissingPaymentMethod(booking_id));
        }
        let booking = self.store.transition_status(
            &txn,
            booking_id,
            &[BookingStatus::Quoted],
            BookingStatus::Confirmed,
            now(),
        )?;
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, "Booking confirmed");
        Ok(booking)
    }

    /// Admin status override. Honors the transition table; `PAID` is
    /// reserved for payment capture and cannot be set here, and `CANCELLED`
    /// goes through the cancellation service so fee policy applies.
    pub fn change_status(&self, booking_id: u64, to: BookingStatus) -> BookingResult<Booking> {
        match to {
            BookingStatus::Paid => {
                return Err(BookingError::Validation(
                    "PAID is set by payment capture, not by status override".to_string(),
                ));
            }
            BookingStatus::Cancelled => {
                return Err(BookingError::Validation(
                    "use the cancellation endpoint to cancel a booking".to_string(),
                ));
            }
            _ => {}
        }

        let txn = self.store.begin_write()?;
        let booking = {
            let booking = self.store.load_booking(&txn, booking_id)?;
            booking.status.check_transition(to)?;
            self.store
                .transition_status(&txn, booking_id, &[booking.status], to, now())?
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, status = %booking.status, "Status changed");
        Ok(booking)
    }
}
