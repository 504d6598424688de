//! Webhook delivery handling
//!
//! Only a bad signature earns a rejection. Processing failures for a
//! correctly signed event are absorbed with a 200 so the provider does not
//! retry a case that needs manual attention, except plausibly-transient
//! storage failures, which return 5xx to trigger redelivery.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::warn;

use shared::util::now;

use crate::booking::BookingError;
use crate::core::ServerState;
use crate::notify::{Notification, NotificationKind};
use crate::payments::{AppliedEvent, EventDisposition};
use crate::utils::{AppError, AppResult};

const SIGNATURE_HEADER: &str = "stripe-signature";

pub async fn stripe(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("missing stripe-signature header".to_string()))?;

    let event = state
        .webhook_verifier
        .verify_and_parse(&body, signature, now().timestamp())?;

    match state.payments.apply_event(&event) {
        Ok(EventDisposition::Applied(AppliedEvent::PaymentSucceeded)) => {
            if let Some(booking_id) = event.booking_id
                && let Ok(details) = state.bookings.get_booking(booking_id)
            {
                let mut notification =
                    Notification::new(NotificationKind::PaymentConfirmed, details.booking);
                if let Some(payment) = details.payment {
                    notification = notification.with_payment(payment);
                }
                state.notify(notification);
            }
            Ok(StatusCode::OK)
        }
        // Card authorization needs no customer notification; duplicates and
        // unknown kinds are acknowledged silently
        Ok(_) => Ok(StatusCode::OK),
        // Transient storage failure: fail loud so the provider redelivers
        Err(err @ BookingError::Storage(_)) => Err(err.into()),
        Err(err) => {
            warn!(event_id = %event.id, error = %err, "Webhook event absorbed after processing error");
            Ok(StatusCode::OK)
        }
    }
}
