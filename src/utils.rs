//! Utility functions for the range service

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Generate a new unique range ID
pub fn generate_range_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as an RFC 3339 string with millisecond precision
pub fn timestamp_string() -> String {
    current_timestamp().to_rfc3339_opts(SecondsFormat::Millis, true)
}
