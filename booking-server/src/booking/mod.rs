//! Booking domain: error taxonomy, intake, and lifecycle

pub mod error;
pub mod service;

pub use error::{BookingError, BookingResult};
pub use service::{BookingDetails, BookingService, NewBooking, QuoteFigures};
