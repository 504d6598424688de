//! Customer Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Customer entity, keyed by email (unique). Upserted on booking submission
/// and referenced by many bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
