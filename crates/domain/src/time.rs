//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for trigger times, pause windows and action bookkeeping.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whole seconds elapsed between `since` and `now`, clamped at zero.
#[must_use]
pub fn elapsed_secs(since: Timestamp, now: Timestamp) -> u64 {
    u64::try_from((now - since).num_seconds()).unwrap_or(0)
}

/// Parse an ISO-8601 / RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns the underlying [`chrono::ParseError`] when the input is not a
/// valid RFC 3339 timestamp.
pub fn parse_iso8601(value: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.to_utc())
}
