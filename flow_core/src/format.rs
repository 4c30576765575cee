use chrono::{DateTime, Local};
use rust_decimal::prelude::*;

/// Group an unsigned integer string by thousands: "1234567" -> "1,234,567"
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Display a number with thousands separators and at most two fractional
/// digits, dropping trailing fractional zeros: 1234567.891 -> "1,234,567.89".
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let decimal = match Decimal::from_f64_retain(value) {
        Some(decimal) => decimal,
        None => return format!("{:.2}", value),
    };

    let rounded = decimal
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();

    let text = rounded.abs().to_string();
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut formatted = String::new();
    if rounded.is_sign_negative() && !rounded.is_zero() {
        formatted.push('-');
    }
    formatted.push_str(&group_thousands(integer));
    if let Some(fraction) = fraction {
        formatted.push('.');
        formatted.push_str(fraction);
    }
    formatted
}

/// Display an ISO-8601 timestamp in local time, e.g. "10/27/2023, 10:00:00 AM".
/// Input that does not parse is returned unchanged.
pub fn format_date(iso_date: &str) -> String {
    match DateTime::parse_from_rfc3339(iso_date) {
        Ok(dt) => dt
            .with_timezone(&Local)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string(),
        Err(_) => iso_date.to_string(),
    }
}
