use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const WINDOW_LENGTH: Duration = Duration::hours(24);

/// Zones offered by `config zones`.
pub const COMMON_TIME_ZONES: [&str; 7] = [
    "UTC",
    "Asia/Kolkata",
    "Europe/London",
    "America/New_York",
    "America/Los_Angeles",
    "Asia/Tokyo",
    "Australia/Sydney",
];

/// Time of day at which an accounting day begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStart {
    hour: u32,
    minute: u32,
}

impl DayStart {
    /// Out of range values are clamped instead of rejected, so `25:70` becomes `23:59`.
    pub fn new(hour: i64, minute: i64) -> Self {
        Self {
            hour: hour.clamp(0, 23) as u32,
            minute: minute.clamp(0, 59) as u32,
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Re-applies the clamping to values that came from storage.
    pub fn normalized(self) -> Self {
        Self::new(self.hour.into(), self.minute.into())
    }

    pub fn as_time(&self) -> NaiveTime {
        let normalized = self.normalized();
        NaiveTime::from_hms_opt(normalized.hour, normalized.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for DayStart {
    fn default() -> Self {
        Self { hour: 5, minute: 0 }
    }
}

impl Display for DayStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindowConfig {
    pub day_start: DayStart,
    pub time_zone: Tz,
}

impl Default for DayWindowConfig {
    fn default() -> Self {
        Self {
            day_start: DayStart::default(),
            time_zone: system_time_zone(),
        }
    }
}

/// Zone named by `TZ` when it is a valid IANA identifier, UTC otherwise.
pub fn system_time_zone() -> Tz {
    match std::env::var("TZ") {
        Ok(name) => parse_time_zone(&name).unwrap_or_else(|| {
            warn!("TZ={name} is not an IANA zone, falling back to UTC");
            Tz::UTC
        }),
        Err(_) => Tz::UTC,
    }
}

pub fn parse_time_zone(name: &str) -> Option<Tz> {
    Tz::from_str(name.trim()).ok()
}

/// A 24 hour accounting window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window that starts at the most recent occurrence of the configured day start in the
    /// configured zone. A day start equal to `now` opens a new window at `now`.
    pub fn containing(now: DateTime<Utc>, config: &DayWindowConfig) -> Self {
        let zone = config.time_zone;
        let local_date = now.with_timezone(&zone).date_naive();
        let candidate = resolve_local(zone, local_date.and_time(config.day_start.as_time()));

        let mut start = if now < candidate {
            candidate - WINDOW_LENGTH
        } else {
            candidate
        };
        // A 25 hour local day (DST fall back) can leave `now` past the end of the window.
        while now >= start + WINDOW_LENGTH {
            start += WINDOW_LENGTH;
        }

        Self {
            start,
            end: start + WINDOW_LENGTH,
        }
    }

    /// Whole minutes until the window closes, never negative.
    pub fn minutes_left(&self, now: DateTime<Utc>) -> u64 {
        (self.end - now).num_minutes().max(0) as u64
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Turns a wall clock time into an instant. Ambiguous times (DST fall back) take the earlier
/// instant, times inside a DST gap move forward to the first wall time that exists.
fn resolve_local(zone: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    let mut probe = local;
    // Gaps are at most a couple of hours, a full day of probing is plenty.
    for _ in 0..(24 * 60) {
        if let Some(resolved) = zone.from_local_datetime(&probe).earliest() {
            return resolved.with_timezone(&Utc);
        }
        probe += Duration::minutes(1);
    }
    warn!("Couldn't resolve local time {local} in {zone}, treating it as UTC");
    Utc.from_utc_datetime(&local)
}

/// Three step urgency scale derived from the hours left in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderLevel {
    Relaxed,
    Caution,
    Urgent,
}

impl ReminderLevel {
    pub fn from_minutes_left(minutes_left: u64) -> Self {
        let hours_left = minutes_left as f64 / 60.;
        if hours_left > 6. {
            ReminderLevel::Relaxed
        } else if hours_left > 2. {
            ReminderLevel::Caution
        } else {
            ReminderLevel::Urgent
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ReminderLevel::Relaxed => "Good, lots of time",
            ReminderLevel::Caution => "Caution, time shrinking",
            ReminderLevel::Urgent => "Urgent, very little time",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;

    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, s)
                .unwrap(),
        )
    }

    fn config(hour: i64, minute: i64, zone: Tz) -> DayWindowConfig {
        DayWindowConfig {
            day_start: DayStart::new(hour, minute),
            time_zone: zone,
        }
    }

    #[test]
    fn test_window_before_day_start_uses_previous_day() {
        let now = utc(2025, 3, 10, 4, 0, 0);
        let window = DayWindow::containing(now, &config(5, 0, Tz::UTC));

        assert_eq!(window.start, utc(2025, 3, 9, 5, 0, 0));
        assert_eq!(window.end, utc(2025, 3, 10, 5, 0, 0));
        assert_eq!(window.minutes_left(now), 60);
    }

    #[test]
    fn test_window_after_day_start() {
        let now = utc(2025, 3, 10, 17, 30, 30);
        let window = DayWindow::containing(now, &config(5, 0, Tz::UTC));

        assert_eq!(window.start, utc(2025, 3, 10, 5, 0, 0));
        assert_eq!(window.end, utc(2025, 3, 11, 5, 0, 0));
        // 11h 29m 30s left, floored
        assert_eq!(window.minutes_left(now), 689);
        assert!(window.contains(now));
    }

    #[test]
    fn test_window_starts_exactly_at_now() {
        let now = utc(2025, 3, 10, 5, 0, 0);
        let window = DayWindow::containing(now, &config(5, 0, Tz::UTC));

        assert_eq!(window.start, now);
        assert_eq!(window.minutes_left(now), 24 * 60);
    }

    #[test]
    fn test_window_respects_time_zone() {
        // 23:00 UTC is 04:30 next day in Kolkata, before a 05:00 day start.
        let now = utc(2025, 3, 10, 23, 0, 0);
        let window = DayWindow::containing(now, &config(5, 0, Tz::Asia__Kolkata));

        // 05:00 IST on March 10th is 23:30 UTC on March 9th.
        assert_eq!(window.start, utc(2025, 3, 9, 23, 30, 0));
        assert_eq!(window.minutes_left(now), 30);
    }

    #[test]
    fn test_window_start_inside_dst_gap_moves_forward() {
        // New York skips 02:00-03:00 on 2025-03-09.
        let now = utc(2025, 3, 9, 12, 0, 0);
        let window = DayWindow::containing(now, &config(2, 30, Tz::America__New_York));

        // 03:00 EDT is 07:00 UTC.
        assert_eq!(window.start, utc(2025, 3, 9, 7, 0, 0));
        assert!(window.contains(now));
    }

    #[test]
    fn test_window_always_contains_now_on_long_day() {
        // New York repeats 01:00-02:00 on 2025-11-02, making the local day 25 hours long.
        let now = utc(2025, 11, 3, 4, 30, 0);
        let window = DayWindow::containing(now, &config(0, 0, Tz::America__New_York));
        assert!(window.contains(now));
        assert_eq!(window.end - window.start, WINDOW_LENGTH);
    }

    #[test]
    fn test_day_start_clamps() {
        let start = DayStart::new(25, -4);
        assert_eq!(start.hour(), 23);
        assert_eq!(start.minute(), 0);
        assert_eq!(DayStart::new(7, 75).to_string(), "07:59");
    }

    #[test]
    fn test_reminder_levels() {
        assert_eq!(ReminderLevel::from_minutes_left(7 * 60), ReminderLevel::Relaxed);
        assert_eq!(ReminderLevel::from_minutes_left(6 * 60), ReminderLevel::Caution);
        assert_eq!(ReminderLevel::from_minutes_left(6 * 60 + 1), ReminderLevel::Relaxed);
        assert_eq!(ReminderLevel::from_minutes_left(2 * 60 + 1), ReminderLevel::Caution);
        assert_eq!(ReminderLevel::from_minutes_left(2 * 60), ReminderLevel::Urgent);
        assert_eq!(ReminderLevel::from_minutes_left(0), ReminderLevel::Urgent);
    }

    #[test]
    fn test_parse_time_zone() {
        assert_eq!(parse_time_zone("Europe/London"), Some(Tz::Europe__London));
        assert_eq!(parse_time_zone(" UTC "), Some(Tz::UTC));
        assert_eq!(parse_time_zone("Mars/Olympus"), None);
    }
}
