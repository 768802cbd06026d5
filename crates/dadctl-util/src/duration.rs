//! Duration values as they appear in the JSON configuration and state files
//!
//! A duration is written either as an integer count of nanoseconds or as a
//! unit-suffixed string such as `"15m"`, `"1h30m"` or `"1.5s"`. Durations are
//! always written back out in the string form (`"15m0s"`).

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::{ControllerError, Result};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a unit-suffixed duration string.
///
/// Accepted units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. Components may
/// carry a decimal fraction and are summed (`"2h45m30.5s"`). A bare `"0"` is
/// accepted. Negative durations are rejected.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let mut rest = s.trim();
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(ControllerError::duration(s, "empty duration"));
    }
    if rest.starts_with('-') {
        return Err(ControllerError::duration(s, "negative durations are not allowed"));
    }
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        rest = &rest[number_end..];
        if number.is_empty() || number == "." {
            return Err(ControllerError::duration(s, "expected a number"));
        }

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3600 * NANOS_PER_SEC,
            "" => return Err(ControllerError::duration(s, "missing unit")),
            other => {
                return Err(ControllerError::duration(
                    s,
                    format!("unknown unit '{}'", other),
                ));
            }
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ControllerError::duration(s, "invalid number"))?
        };

        let mut value = whole
            .checked_mul(scale)
            .ok_or_else(|| ControllerError::duration(s, "duration overflow"))?;
        let mut digit_scale = scale;
        for c in fraction.chars() {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| ControllerError::duration(s, "invalid number"))?;
            digit_scale /= 10;
            value += digit as u128 * digit_scale;
        }

        total = total
            .checked_add(value)
            .ok_or_else(|| ControllerError::duration(s, "duration overflow"))?;
    }

    let nanos =
        u64::try_from(total).map_err(|_| ControllerError::duration(s, "duration overflow"))?;
    Ok(Duration::from_nanos(nanos))
}

/// Format a duration in the compact form accepted by [`parse_duration`]
/// (`"1h0m0s"`, `"15m0s"`, `"1.5s"`, `"250ms"`).
pub fn format_duration_compact(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".into();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", decimal(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, NANOS_PER_MILLI));
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = (total_secs % 60) as u128 * NANOS_PER_SEC + d.subsec_nanos() as u128;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h{}m", hours, minutes));
    } else if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&decimal(seconds, NANOS_PER_SEC));
    out.push('s');
    out
}

fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }

    let width = unit.to_string().len() - 1;
    let text = format!("{}.{:0width$}", whole, fraction, width = width);
    text.trim_end_matches('0').to_string()
}

/// A `Duration` that (de)serializes the way the configuration and state files
/// spell durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JsonDuration(pub Duration);

impl From<Duration> for JsonDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<JsonDuration> for Duration {
    fn from(d: JsonDuration) -> Self {
        d.0
    }
}

impl fmt::Display for JsonDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration_compact(self.0))
    }
}

impl Serialize for JsonDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration_compact(self.0))
    }
}

impl<'de> Deserialize<'de> for JsonDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(JsonDurationVisitor)
    }
}

struct JsonDurationVisitor;

impl<'de> Visitor<'de> for JsonDurationVisitor {
    type Value = JsonDuration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a nanosecond count or a duration string like \"15m\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(JsonDuration(Duration::from_nanos(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        u64::try_from(v)
            .map(|nanos| JsonDuration(Duration::from_nanos(nanos)))
            .map_err(|_| E::custom("negative durations are not allowed"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        if !v.is_finite() || v < 0.0 || v > u64::MAX as f64 {
            return Err(E::custom(format!("invalid nanosecond count {}", v)));
        }
        Ok(JsonDuration(Duration::from_nanos(v as u64)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        parse_duration(v).map(JsonDuration).map_err(E::custom)
    }
}
