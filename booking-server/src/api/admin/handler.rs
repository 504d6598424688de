//! Staff-facing booking handlers

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use shared::models::{Booking, BookingStatus, Quotation};

use crate::booking::QuoteFigures;
use crate::core::ServerState;
use crate::notify::{Notification, NotificationKind};
use crate::payments::InvoiceFigures;
use crate::utils::{AppError, AppResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: BookingStatus,
}

/// Status override, honoring the transition table
pub async fn change_status(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<ChangeStatusRequest>,
) -> AppResult<Json<AppResponse<Booking>>> {
    Ok(ok(state.bookings.change_status(id, payload.status)?))
}

#[derive(Debug, Deserialize)]
pub struct QuotationRequest {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    /// Whether to notify the customer about the new quote
    #[serde(default = "default_true")]
    pub send_email: bool,
}

fn default_true() -> bool {
    true
}

/// Create or replace the quotation; moves the booking to `QUOTED`
pub async fn upsert_quotation(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<QuotationRequest>,
) -> AppResult<Json<AppResponse<Quotation>>> {
    let (booking, quotation) = state.bookings.upsert_quotation(
        id,
        QuoteFigures {
            subtotal: payload.subtotal,
            tax: payload.tax,
            total: payload.total,
        },
    )?;

    if payload.send_email {
        state.notify(
            Notification::new(NotificationKind::QuoteSent, booking)
                .with_quotation(quotation.clone()),
        );
    }
    Ok(ok(quotation))
}

#[derive(Debug, Deserialize, Validate)]
pub struct FinalizeInvoiceRequest {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
}

/// Finalize the invoice figures; moves the booking to `INVOICED`
pub async fn finalize_invoice(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<FinalizeInvoiceRequest>,
) -> AppResult<Json<AppResponse<Booking>>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (booking, payment) = state.payments.finalize_invoice(
        id,
        InvoiceFigures {
            subtotal: payload.subtotal,
            tax: payload.tax,
            total: payload.total,
            currency: payload.currency,
        },
    )?;

    state.notify(
        Notification::new(NotificationKind::InvoiceSent, booking.clone()).with_payment(payment),
    );
    Ok(ok(booking))
}
