//! Payment provider webhook endpoint

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Webhook router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/webhooks/stripe", post(handler::stripe))
}
