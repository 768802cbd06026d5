//! Time utilities for dad-controller
//!
//! Schedules are expressed per weekday with time-of-day bounds encoded as
//! `HHMM` integers (2000 = 20:00). Everything the engine evaluates is derived
//! from a `DateTime<Local>` handed to it by a clock, so these helpers never
//! read the wall clock themselves (except [`now`]).
//!
//! # Mock Time for Development
//!
//! In debug builds, the `DADCTL_MOCK_TIME` environment variable can be set
//! to override the system time seen by the controller. This is useful for
//! exercising schedules without waiting for the right hour.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! DADCTL_MOCK_TIME="2025-12-25 20:30:00" ./dadctld
//! ```

use chrono::{DateTime, Datelike, Local, NaiveDateTime, TimeZone, Timelike, Weekday};
use std::sync::OnceLock;
use std::time::Duration;

use crate::{ControllerError, Result};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "DADCTL_MOCK_TIME";

/// Format accepted by [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Every weekday, Sunday first (the order used by weekday indices)
pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                    Ok(naive_dt) => {
                        if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = MOCK_TIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // the one place allowed to read the wall clock
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Format a DateTime with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Time of day of `dt` in `HHMM` encoding (e.g. 21:05 -> 2105)
pub fn time_of_day(dt: &DateTime<Local>) -> u16 {
    (dt.hour() * 100 + dt.minute()) as u16
}

/// Check an `HHMM` value: hour 0-23, minute 0-59
pub fn validate_time_of_day(hhmm: u32) -> Result<u16> {
    if hhmm > 2359 || hhmm % 100 >= 60 {
        return Err(ControllerError::InvalidTimeOfDay(hhmm));
    }
    Ok(hhmm as u16)
}

/// True when both timestamps fall on the same calendar date
pub fn same_calendar_date(a: &DateTime<Local>, b: &DateTime<Local>) -> bool {
    a.year() == b.year() && a.month() == b.month() && a.day() == b.day()
}

/// Weekday index with Sunday = 0 through Saturday = 6
pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// Inverse of [`weekday_index`]
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    ALL_WEEKDAYS.get(index as usize).copied()
}

/// Parse a weekday given either as an index (`"0"` = Sunday) or a name
/// (`"mon"`, `"Monday"`, case-insensitive)
pub fn parse_weekday(s: &str) -> Result<Weekday> {
    let trimmed = s.trim();
    if let Ok(index) = trimmed.parse::<u8>() {
        return weekday_from_index(index).ok_or_else(|| ControllerError::weekday(s));
    }

    match trimmed.to_lowercase().as_str() {
        "sun" | "sunday" => Ok(Weekday::Sun),
        "mon" | "monday" => Ok(Weekday::Mon),
        "tue" | "tuesday" => Ok(Weekday::Tue),
        "wed" | "wednesday" => Ok(Weekday::Wed),
        "thu" | "thursday" => Ok(Weekday::Thu),
        "fri" | "friday" => Ok(Weekday::Fri),
        "sat" | "saturday" => Ok(Weekday::Sat),
        _ => Err(ControllerError::weekday(s)),
    }
}

/// Helper to format durations in human-readable form for logs
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
