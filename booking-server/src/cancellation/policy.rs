//! Cancellation decision rules
//!
//! Pure function of the clock and the booking's own timestamps, kept free
//! of storage and provider concerns so the boundary cases are trivially
//! testable.

use chrono::{DateTime, Utc};

/// Outcome of evaluating a cancellation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationDecision {
    /// Pickup time reached or passed; cancellation is no longer possible
    Disallowed,
    /// At or before the free-cancellation deadline
    Free,
    /// Between the deadline and pickup; the fixed fee applies
    FeeRequired,
}

/// Decide whether a cancellation at `now` is allowed, and at what cost.
/// The deadline boundary is inclusive: cancelling exactly at the deadline
/// is still free. The pickup boundary is exclusive: `now == pickup` is
/// already too late.
pub fn decide(
    now: DateTime<Utc>,
    pickup: DateTime<Utc>,
    free_deadline: DateTime<Utc>,
) -> CancellationDecision {
    if now >= pickup {
        CancellationDecision::Disallowed
    } else if now <= free_deadline {
        CancellationDecision::Free
    } else {
        CancellationDecision::FeeRequired
    }
}
