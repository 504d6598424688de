//! Staff-facing booking administration API

mod handler;

use axum::{
    Router,
    routing::{post, put},
};

use crate::core::ServerState;

/// Admin router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admin/bookings", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/{id}/status", put(handler::change_status))
        .route("/{id}/quotation", put(handler::upsert_quotation))
        .route("/{id}/finalize", post(handler::finalize_invoice))
}
