//! Data models
//!
//! Shared between booking-server and frontend (via API).
//! Booking ids are `u64`, allocated from the store's sequence counter.
//! All monetary fields are `rust_decimal::Decimal`; `f64` never crosses
//! a persistence or provider boundary.

pub mod booking;
pub mod customer;
pub mod discount_code;
pub mod payment;
pub mod quotation;

// Re-exports
pub use booking::*;
pub use customer::*;
pub use discount_code::*;
pub use payment::*;
pub use quotation::*;
