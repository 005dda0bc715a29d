use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Formats a minute count the way the planner shows budgets: `1h 30m`, `2h`, `45m`.
pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Formats a stopwatch duration: `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_seconds(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Renders an instant as a 24 hour wall clock time in `zone`.
pub fn format_clock(instant: DateTime<Utc>, zone: Tz, show_seconds: bool) -> String {
    let local = zone.from_utc_datetime(&instant.naive_utc());
    if show_seconds {
        local.format("%H:%M:%S").to_string()
    } else {
        local.format("%H:%M").to_string()
    }
}

/// Renders an instant with its date in `zone`, used for history listings.
pub fn format_date_time(instant: DateTime<Utc>, zone: Tz) -> String {
    zone.from_utc_datetime(&instant.naive_utc())
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
