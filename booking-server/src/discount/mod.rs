//! Discount code validation and application

pub mod engine;

pub use engine::DiscountEngine;
