//! Customer-facing booking API

mod handler;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::core::ServerState;

/// Booking router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/bookings", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/setup-intent", post(handler::create_setup_intent))
        .route("/{id}/confirm", post(handler::confirm))
        .route("/{id}/payment-intent", post(handler::create_payment_intent))
        .route("/{id}/pay", post(handler::confirm_payment))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/discount", post(handler::apply_discount))
        .route("/{id}/discount", delete(handler::remove_discount))
}
