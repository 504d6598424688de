//! Cancellation execution
//!
//! Evaluates the policy against the booking's own timestamps, collects the
//! fixed fee when one is due, and commits the cancelled state. Fee
//! collection and the status flip are a single transaction: a booking is
//! never marked cancelled unless any required fee was actually charged.
//!
//! Returns a result object; notification dispatch is the caller's concern
//! so a notification failure can never look like a cancellation failure.

use rust_decimal::Decimal;
use tracing::info;

use shared::models::{Booking, BookingStatus, PaymentStatus};
use shared::util::now;

use crate::booking::{BookingError, BookingResult};
use crate::db::BookingStore;
use crate::payments::PaymentService;

use super::policy::{self, CancellationDecision};

/// What a successful cancellation did
#[derive(Debug, Clone)]
pub struct CancellationOutcome {
    pub booking: Booking,
    /// `Some` only when a fee was actually collected
    pub fee_charged: Option<Decimal>,
}

/// Cancellation engine
#[derive(Clone)]
pub struct CancellationService {
    store: BookingStore,
    payments: PaymentService,
    fee: Decimal,
}

impl CancellationService {
    pub fn new(store: BookingStore, payments: PaymentService, fee: Decimal) -> Self {
        Self {
            store,
            payments,
            fee,
        }
    }

    pub async fn cancel(&self, booking_id: u64) -> BookingResult<CancellationOutcome> {
        let booking = self
            .store
            .get_booking(booking_id)?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        if booking.status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }

        let now_ts = now();
        match policy::decide(
            now_ts,
            booking.preferred_datetime,
            booking.free_cancellation_deadline,
        ) {
            CancellationDecision::Disallowed => Err(BookingError::PickupTimePassed(booking_id)),
            CancellationDecision::Free => self.commit_cancellation(booking_id, None, None),
            CancellationDecision::FeeRequired => {
                let payment = self
                    .store
                    .get_payment(booking_id)?
                    .filter(|p| p.has_payment_method())
                    .ok_or(BookingError::MissingPaymentMethod(booking_id))?;

                // Charge first; a provider failure leaves the booking in its
                // prior status and surfaces as retryable or declined.
                let intent = self.payments.charge_off_session(&payment, self.fee).await?;
                self.commit_cancellation(booking_id, Some(self.fee), Some(intent.id))
            }
        }
    }

    /// Flip the booking to `CANCELLED` and, when a fee was collected,
    /// record it on the payment row in the same transaction
    fn commit_cancellation(
        &self,
        booking_id: u64,
        fee: Option<Decimal>,
        fee_intent_id: Option<String>,
    ) -> BookingResult<CancellationOutcome> {
        let now_ts = now();
        let txn = self.store.begin_write()?;
        let booking = {
            let mut booking = self.store.load_booking(&txn, booking_id)?;
            if booking.status == BookingStatus::Cancelled {
                return Err(BookingError::AlreadyCancelled(booking_id));
            }
            booking.status.check_transition(BookingStatus::Cancelled)?;

            if fee.is_some() {
                let mut payment = self
                    .store
                    .load_payment(&txn, booking_id)?
                    .ok_or(BookingError::PaymentNotFound(booking_id))?;
                payment.status = PaymentStatus::CancellationFeeCharged;
                payment.provider_payment_intent_id = fee_intent_id;
                payment.updated_at = now_ts;
                self.store.store_payment(&txn, &payment)?;
            }

            booking.status = BookingStatus::Cancelled;
            booking.cancelled_at = Some(now_ts);
            booking.cancellation_fee = fee;
            booking.updated_at = now_ts;
            self.store.store_booking(&txn, &booking)?;
            booking
        };
        txn.commit().map_err(crate::db::StorageError::from)?;

        info!(booking_id, fee = ?fee, "Booking cancelled");
        Ok(CancellationOutcome {
            booking,
            fee_charged: fee,
        })
    }
}
