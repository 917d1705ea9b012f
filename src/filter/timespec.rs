//! Time literals of time and duration conditions.
//!
//! ```text
//! 1234567890          UNIX timestamp
//! 1y2m3w4d5h6i7s      relative delta (year, month, week, day, hour, minute, second)
//! 2024-01-31          ISO date, optionally followed by T12, T12:30 or T12:30:59
//! 01/31/2024          U.S. date
//! 31.01.2024          European date
//! ```

use chrono::{DateTime, Local, Months, NaiveDate, NaiveTime, TimeZone};
use regex::Regex;
use std::sync::LazyLock;

static TIMEDELTA_RE: LazyLock<Regex> = LazyLock::new(|| {
    let units: String = "ymwdhis"
        .chars()
        .map(|unit| format!(r"(?:(?P<{unit}>\d+)[{unit}{}])?", unit.to_ascii_uppercase()))
        .collect();
    Regex::new(&format!("^{units}$")).expect("valid time delta regex")
});

/// Whether `literal` follows the relative delta grammar.
pub fn is_time_delta(literal: &str) -> bool {
    TIMEDELTA_RE.is_match(literal)
}

pub fn to_timestamp(dt: DateTime<Local>) -> f64 {
    dt.timestamp_millis() as f64 / 1000.0
}

/// Timestamp `literal` before `now`, or `Ok(None)` when it is no delta.
pub fn subtract_delta(now: DateTime<Local>, literal: &str) -> Result<Option<f64>, String> {
    let Some(caps) = TIMEDELTA_RE.captures(literal) else {
        return Ok(None);
    };

    let count = |unit: &str| -> Result<u64, String> {
        caps.name(unit)
            .map_or(Ok(0), |m| m.as_str().parse::<u64>())
            .map_err(|e| e.to_string())
    };

    // Years and months use calendar arithmetic, the rest are fixed spans
    let months = count("y")?
        .checked_mul(12)
        .and_then(|m| m.checked_add(count("m").ok()?))
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(|| format!("delta out of range: {literal}"))?;
    let shifted = now
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| format!("delta out of range: {literal}"))?;

    let seconds = count("w")? as f64 * 7.0 * 86400.0
        + count("d")? as f64 * 86400.0
        + count("h")? as f64 * 3600.0
        + count("i")? as f64 * 60.0
        + count("s")? as f64;

    Ok(Some(to_timestamp(shifted) - seconds))
}

/// Timestamp of an absolute date (and optional time of day) in local time.
pub fn parse_absolute(literal: &str) -> Result<f64, String> {
    let value = literal.to_uppercase().replace(' ', "T");
    let (date_part, time_part) = match value.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (value.as_str(), None),
    };

    let date_format = if date_part.contains('/') {
        "%m/%d/%Y"
    } else if date_part.contains('.') {
        "%d.%m.%Y"
    } else {
        "%Y-%m-%d"
    };
    let date = NaiveDate::parse_from_str(date_part, date_format).map_err(|e| e.to_string())?;

    let time = match time_part {
        None => NaiveTime::MIN,
        Some(time) => {
            let parts = time
                .split(':')
                .map(|part| part.parse::<u32>().map_err(|e| e.to_string()))
                .collect::<Result<Vec<u32>, String>>()?;
            if parts.len() > 3 {
                return Err(format!("too many time components in '{time}'"));
            }
            let hour = parts[0];
            let minute = parts.get(1).copied().unwrap_or(0);
            let second = parts.get(2).copied().unwrap_or(0);
            NaiveTime::from_hms_opt(hour, minute, second)
                .ok_or_else(|| format!("invalid time of day '{time}'"))?
        }
    };

    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(to_timestamp)
        .ok_or_else(|| format!("'{literal}' does not exist in the local timezone"))
}
