use crate::{AnalysisError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::str::FromStr;
use tracing::debug;

/// Parse a request boundary date.
///
/// Accepts a full RFC 3339 timestamp (`2024-01-15T10:30:00.000Z`), a
/// timestamp without offset (taken as UTC) or a plain date (`2024-01-15`,
/// midnight UTC).
pub fn parse_request_date(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        let parsed = dt.with_timezone(&Utc);
        debug!("{} parsed as RFC 3339 => {}", field, parsed.timestamp());
        return Ok(parsed);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        let parsed = Utc.from_utc_datetime(&naive);
        debug!("{} parsed as naive timestamp => {}", field, parsed.timestamp());
        return Ok(parsed);
    }

    if let Ok(naive_date) = NaiveDate::from_str(value) {
        let naive_datetime = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AnalysisError::Validation(format!("Invalid {}: {}", field, value)))?;
        let parsed = Utc.from_utc_datetime(&naive_datetime);
        debug!("{} parsed as date => {}", field, parsed.timestamp());
        return Ok(parsed);
    }

    Err(AnalysisError::Validation(format!(
        "Invalid {}: '{}' is not an ISO-8601 date",
        field, value
    )))
}

/// True when the block time lies inside the inclusive window
pub fn is_within_window(block_time_ms: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    block_time_ms >= start.timestamp_millis() && block_time_ms <= end.timestamp_millis()
}
