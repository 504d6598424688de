use chrono::{DateTime, Utc};

/// Current UTC time, single call site for the whole workspace
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
