//! Display helpers used by field formatters.

use chrono::{Local, TimeZone};

/// Human-readable byte size, e.g. `   1.5 MiB`.
pub fn human_size(size: f64) -> String {
    if size < 0.0 {
        return "-??? bytes".to_string();
    }
    if size < 1024.0 {
        return format!("{:4} bytes", size as u64);
    }

    let mut scaled = size;
    for unit in ["KiB", "MiB", "GiB"] {
        scaled /= 1024.0;
        if scaled < 1024.0 {
            return format!("{scaled:6.1} {unit}");
        }
    }
    format!("{scaled:6.1} GiB")
}

/// ISO date and time (local timezone) of a UNIX timestamp.
pub fn iso_datetime(timestamp: f64) -> String {
    match Local.timestamp_opt(timestamp.trunc() as i64, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "never".to_string(),
    }
}

/// Compact span like `2d 3h`, keeping at most `precision` parts (0 = all).
pub fn human_duration(seconds: f64, precision: usize) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let total = seconds.abs().trunc() as u64;
    let mut parts = vec![
        ('w', total / (7 * 86400)),
        ('d', total / 86400 % 7),
        ('h', total / 3600 % 24),
        ('m', total / 60 % 60),
        ('s', total % 60),
    ];

    while parts.len() > 1 && parts[0].1 == 0 {
        parts.remove(0);
    }
    if precision > 0 {
        parts.truncate(precision);
    }

    let rendered: Vec<String> = parts
        .iter()
        .map(|(unit, count)| format!("{count}{unit}"))
        .collect();
    format!("{sign}{}", rendered.join(" "))
}
