//! Unified API error handling
//!
//! Application-level error type and response envelope:
//! - [`AppError`] - HTTP-facing error enum
//! - [`AppResponse`] - API response structure
//!
//! # Error code scheme
//!
//! | Prefix | Category | Example |
//! |--------|----------|---------|
//! | E0xxx | Business errors | E0003 not found |
//! | E9xxx | System errors | E9002 database error |
//!
//! Customer-facing messages come from a small stable set; internal detail
//! (provider intent ids, storage text) never crosses this boundary.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::booking::BookingError;
use crate::payments::{ProviderError, WebhookError};

/// Unified API response envelope
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// Error code (E0000 on success)
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// HTTP-facing application error
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Business errors (4xx) ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Guard failure with a stable customer-readable reason
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Payment declined")]
    PaymentDeclined,

    // ========== System errors (5xx) ==========
    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),

            // Conflict (409)
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg.as_str()),

            // Validation (400)
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),

            // Business rule (422)
            AppError::BusinessRule(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E0005", msg.as_str())
            }

            // Card declined (402)
            AppError::PaymentDeclined => {
                (StatusCode::PAYMENT_REQUIRED, "E0007", "payment declined")
            }

            // Provider unreachable (502) - retryable by the client
            AppError::ProviderUnavailable(msg) => {
                error!(target: "provider", error = %msg, "Payment provider unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "E9003",
                    "payment provider unavailable",
                )
            }

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9002", "Database error")
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error",
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) => AppError::Validation(msg),

            BookingError::BookingNotFound(id) => AppError::NotFound(format!("booking {id}")),
            BookingError::QuotationNotFound(id) => {
                AppError::NotFound(format!("quotation for booking {id}"))
            }
            BookingError::PaymentNotFound(id) => {
                AppError::NotFound(format!("payment for booking {id}"))
            }
            BookingError::DiscountNotFound(code) => {
                AppError::NotFound(format!("discount code {code}"))
            }

            BookingError::DiscountInactive(_) => {
                AppError::BusinessRule("discount code is not active".to_string())
            }
            BookingError::DiscountNotYetValid(_) => {
                AppError::BusinessRule("discount code is not yet valid".to_string())
            }
            BookingError::DiscountExpired(_) => {
                AppError::BusinessRule("discount code has expired".to_string())
            }
            BookingError::DiscountAlreadyApplied(_) => {
                AppError::Conflict("a discount code is already applied".to_string())
            }

            BookingError::InvalidTransition(e) => AppError::Conflict(e.to_string()),
            BookingError::AlreadyCancelled(_) => {
                AppError::Conflict("booking is already cancelled".to_string())
            }
            BookingError::Conflict(msg) => AppError::Conflict(msg),

            BookingError::PickupTimePassed(_) => {
                AppError::BusinessRule("pickup time passed".to_string())
            }
            BookingError::MissingPaymentMethod(_) => {
                AppError::BusinessRule("payment information missing".to_string())
            }

            BookingError::Provider(ProviderError::Declined(_)) => AppError::PaymentDeclined,
            BookingError::Provider(ProviderError::Network(msg)) => {
                AppError::ProviderUnavailable(msg)
            }
            BookingError::Provider(ProviderError::Api(msg)) => AppError::Internal(msg),

            BookingError::Storage(e) => AppError::Database(e.to_string()),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        // Both cases reject the delivery; the provider will not retry a 400
        AppError::Validation(err.to_string())
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: message.into(),
        data: Some(data),
    })
}

pub type AppResult<T> = Result<T, AppError>;
