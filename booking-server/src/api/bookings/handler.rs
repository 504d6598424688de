//! Customer-facing booking handlers
//!
//! Handlers orchestrate the services and dispatch notifications after a
//! transition has committed; they never reach into storage transactions
//! themselves.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::models::{Address, Booking, BookingItem, BookingStatus, Quotation};

use crate::booking::{BookingDetails, BookingError, NewBooking};
use crate::core::ServerState;
use crate::notify::{Notification, NotificationKind};
use crate::payments::{CaptureOutcome, PaymentIntent, SetupIntent};
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

/// Booking intake payload
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 1, max = 200))]
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub pickup_address: Address,
    pub delivery_address: Option<Address>,
    #[serde(default)]
    pub delivery_required: bool,
    pub items: Vec<BookingItem>,
    pub preferred_datetime: DateTime<Utc>,
}

/// Create a booking in `RECEIVED`
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<AppResponse<Booking>>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let booking = state.bookings.create_booking(NewBooking {
        customer_email: payload.customer_email,
        customer_name: payload.customer_name,
        customer_phone: payload.customer_phone,
        pickup_address: payload.pickup_address,
        delivery_address: payload.delivery_address,
        delivery_required: payload.delivery_required,
        items: payload.items,
        preferred_datetime: payload.preferred_datetime,
    })?;

    // Heads-up to staff that a quote is waiting
    state.notify(Notification::new(
        NotificationKind::QuoteRequested,
        booking.clone(),
    ));
    Ok(ok(booking))
}

/// Booking detail: booking plus quotation and payment snapshots
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<AppResponse<BookingDetails>>> {
    Ok(ok(state.bookings.get_booking(id)?))
}

/// Open a provider setup intent for card collection
pub async fn create_setup_intent(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<AppResponse<SetupIntent>>> {
    let setup = state.payments.start_card_setup(id).await?;
    Ok(ok(setup))
}

/// Confirmation payload: the authorized payment method, optionally with a
/// discount code to apply in the same step
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmBookingRequest {
    #[validate(length(min = 1))]
    pub payment_method_id: String,
    pub discount_code: Option<String>,
}

/// Customer confirms the quotation: record the card, apply an optional
/// discount code, then drive `QUOTED -> CONFIRMED`
pub async fn confirm(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<ConfirmBookingRequest>,
) -> AppResult<Json<AppResponse<BookingDetails>>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .payments
        .authorize_card(id, &payload.payment_method_id)
        .await?;

    if let Some(code) = &payload.discount_code {
        // At most one active code; the engine itself recomputes blindly
        let quotation = state.store.get_quotation(id).map_err(BookingError::from)?;
        if quotation.is_some_and(|q| q.has_discount()) {
            return Err(BookingError::DiscountAlreadyApplied(id).into());
        }
        state.discounts.apply(id, code)?;
    }

    let booking = state.bookings.confirm_booking(id)?;
    state.notify(Notification::new(
        NotificationKind::BookingConfirmed,
        booking,
    ));

    Ok(ok(state.bookings.get_booking(id)?))
}

/// Create (or recreate) the charge intent for the finalized invoice
pub async fn create_payment_intent(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<AppResponse<PaymentIntent>>> {
    let (intent, _) = state.payments.create_charge_intent(id).await?;
    Ok(ok(intent))
}

/// Capture the charge: `INVOICED -> PAID`. Creates the charge intent first
/// if the customer skipped the explicit intent step. Already-paid bookings
/// report success without charging again.
pub async fn confirm_payment(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<AppResponse<BookingDetails>>> {
    let details = state.bookings.get_booking(id)?;
    let needs_intent = details
        .payment
        .as_ref()
        .is_none_or(|p| p.provider_payment_intent_id.is_none());
    if needs_intent && details.booking.status != BookingStatus::Paid {
        state.payments.create_charge_intent(id).await?;
    }

    match state.payments.confirm_capture(id).await? {
        CaptureOutcome::Captured { booking, payment } => {
            state.notify(
                Notification::new(NotificationKind::PaymentConfirmed, booking).with_payment(payment),
            );
            Ok(ok(state.bookings.get_booking(id)?))
        }
        CaptureOutcome::AlreadyPaid(_) => Ok(ok_with_message(
            state.bookings.get_booking(id)?,
            "already paid",
        )),
    }
}

/// Cancellation result exposed to the customer
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub booking: Booking,
    pub fee_charged: Option<rust_decimal::Decimal>,
}

/// Cancel the booking; charges the fixed fee when inside the fee window
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<AppResponse<CancelResponse>>> {
    let outcome = state.cancellations.cancel(id).await?;
    state.notify(Notification::new(
        NotificationKind::BookingCancelled,
        outcome.booking.clone(),
    ));
    Ok(ok(CancelResponse {
        booking: outcome.booking,
        fee_charged: outcome.fee_charged,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyDiscountRequest {
    #[validate(length(min = 1))]
    pub code: String,
}

/// Apply a discount code to the quotation
pub async fn apply_discount(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<ApplyDiscountRequest>,
) -> AppResult<Json<AppResponse<Quotation>>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let quotation = state.store.get_quotation(id).map_err(BookingError::from)?;
    if quotation.is_some_and(|q| q.has_discount()) {
        return Err(BookingError::DiscountAlreadyApplied(id).into());
    }
    Ok(ok(state.discounts.apply(id, &payload.code)?))
}

/// Remove the applied discount code, restoring the original figures
pub async fn remove_discount(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<AppResponse<Quotation>>> {
    Ok(ok(state.discounts.remove(id)?))
}
