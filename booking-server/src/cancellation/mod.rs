//! Cancellation policy and execution

pub mod policy;
pub mod service;

pub use policy::{CancellationDecision, decide};
pub use service::{CancellationOutcome, CancellationService};
