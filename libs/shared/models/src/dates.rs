//! Calendar helpers for the `YYYY-MM-DD` / `HH:MM` strings stored in records.
//!
//! Every helper here is lenient: bad input produces the empty string or zero
//! wrapped in [`Parsed::Default`], never an error.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use regex::Regex;

use crate::record::Parsed;

pub const DAY_FORMAT: &str = "%Y-%m-%d";
pub const CLOCK_FORMAT: &str = "%H:%M";

static DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid day pattern"));
static CLOCK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid clock pattern"));

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if !DAY_PATTERN.is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, DAY_FORMAT).ok()
}

/// Canonical `YYYY-MM-DD` form of `raw`, or `""` when it is not a real date.
pub fn normalize_day(raw: &str) -> Parsed<String> {
    match parse_day(raw) {
        Some(day) => Parsed::Value(day.format(DAY_FORMAT).to_string()),
        None => Parsed::Default(String::new()),
    }
}

/// Midnight UTC of `raw` in epoch milliseconds, or `0` when unparseable.
pub fn day_to_epoch_millis(raw: &str) -> Parsed<i64> {
    match parse_day(raw).and_then(|day| day.and_hms_opt(0, 0, 0)) {
        Some(midnight) => Parsed::Value(midnight.and_utc().timestamp_millis()),
        None => Parsed::Default(0),
    }
}

/// Formats an epoch-millisecond timestamp with a chrono pattern.
pub fn format_epoch_millis(millis: i64, pattern: &str) -> Parsed<String> {
    if millis <= 0 {
        return Parsed::Default(String::new());
    }
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(at) => Parsed::Value(at.format(pattern).to_string()),
        None => Parsed::Default(String::new()),
    }
}

/// Minutes since midnight for an `HH:MM` string, or `0` when unparseable.
pub fn parse_clock(raw: &str) -> Parsed<u32> {
    let raw = raw.trim();
    if !CLOCK_PATTERN.is_match(raw) {
        return Parsed::Default(0);
    }
    // "24:00" closes a day that runs to midnight.
    if raw == "24:00" {
        return Parsed::Value(24 * 60);
    }
    match NaiveTime::parse_from_str(raw, CLOCK_FORMAT) {
        Ok(time) => Parsed::Value(time.hour() * 60 + time.minute()),
        Err(_) => Parsed::Default(0),
    }
}

/// Canonical `HH:MM` form of `raw`, or `""` when unparseable.
pub fn normalize_clock(raw: &str) -> Parsed<String> {
    match parse_clock(raw) {
        Parsed::Value(minutes) => Parsed::Value(format_clock(minutes)),
        Parsed::Default(_) => Parsed::Default(String::new()),
    }
}

pub fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
