//! Booking Server - booking lifecycle and billing reconciliation service
//!
//! # Overview
//!
//! A pickup/delivery booking service covering the full lifecycle:
//!
//! - **State machine** (`shared::models::booking`): `RECEIVED -> QUOTED ->
//!   CONFIRMED -> INVOICED -> PAID`, with `CANCELLED` reachable from any
//!   non-terminal state
//! - **Quotation & discounts** (`booking`, `discount`): staff-entered
//!   estimates with single-active discount codes
//! - **Payments** (`payments`): card authorization, invoice finalization,
//!   capture, and idempotent webhook reconciliation against Stripe
//! - **Cancellation** (`cancellation`): free window, fixed late fee charged
//!   off-session
//!
//! # Module structure
//!
//! ```text
//! booking-server/src/
//! ├── core/          # Config, state, server lifecycle
//! ├── api/           # HTTP routes and handlers
//! ├── routes/        # Router assembly and middleware
//! ├── booking/       # Intake, quotation, status changes
//! ├── payments/      # Provider trait, Stripe client, reconciliation
//! ├── discount/      # Discount code engine
//! ├── cancellation/  # Policy and fee collection
//! ├── notify/        # Fire-and-forget notifications
//! ├── money/         # Decimal helpers and validation
//! ├── db/            # redb storage
//! └── utils/         # Errors, logging
//! ```

pub mod api;
pub mod booking;
pub mod cancellation;
pub mod core;
pub mod db;
pub mod discount;
pub mod money;
pub mod notify;
pub mod payments;
pub mod routes;
pub mod utils;

// Re-export common types
pub use booking::{BookingError, BookingResult, BookingService};
pub use cancellation::{CancellationDecision, CancellationService};
pub use core::{Config, Server, ServerState};
pub use db::BookingStore;
pub use discount::DiscountEngine;
pub use payments::{PaymentProvider, PaymentService, StripeGateway, WebhookVerifier};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load .env, create the work directory, and initialize logging
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;

    let log_dir = std::path::Path::new(&config.work_dir).join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(level.as_deref(), log_dir.to_str());
    Ok(())
}
