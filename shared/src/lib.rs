//! Shared types for the booking platform
//!
//! Domain models used by the booking server and by API clients:
//! bookings, customers, quotations, payment records and discount codes.

pub mod models;
pub mod util;

// Re-exports
pub use models::*;
pub use serde::{Deserialize, Serialize};
