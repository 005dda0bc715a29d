use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::time::format_seconds;

use super::entities::{CategoryId, EntryId};

/// Oldest history records beyond this count are discarded.
pub const HISTORY_LIMIT: usize = 200;

/// Upper bound for accumulated paused time, a century. Larger stored values are discarded.
pub const MAX_ELAPSED_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// The single stopwatch session.
///
/// While running only the `origin` is stored: the instant such that `now - origin` is the total
/// elapsed time including everything accumulated before earlier pauses. While paused only the
/// accumulated seconds are stored. Live values are always derived from timestamps, so a process
/// that was suspended shows the right time as soon as it is asked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "TimerSessionEntity", into = "TimerSessionEntity")]
pub enum TimerSession {
    #[default]
    Idle,
    Running {
        origin: DateTime<Utc>,
    },
    Paused {
        elapsed_seconds: u64,
    },
}

impl TimerSession {
    /// Starts or resumes. Accumulated time is folded into a backdated origin. Starting a running
    /// timer does nothing, and neither does resuming when the origin can't be represented.
    pub fn start(&mut self, now: DateTime<Utc>) {
        match *self {
            TimerSession::Running { .. } => {}
            TimerSession::Idle => *self = TimerSession::Running { origin: now },
            TimerSession::Paused { elapsed_seconds } => match backdate(now, elapsed_seconds) {
                Some(origin) => *self = TimerSession::Running { origin },
                None => warn!("Can't resume a timer holding {elapsed_seconds}s"),
            },
        }
    }

    /// Freezes the elapsed time. A pause that lands in the same second as the start leaves
    /// nothing accumulated, so the session goes back to idle.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        let TimerSession::Running { origin } = *self else {
            return;
        };
        let elapsed_seconds = whole_seconds_between(origin, now);
        *self = if elapsed_seconds > 0 {
            TimerSession::Paused { elapsed_seconds }
        } else {
            TimerSession::Idle
        };
    }

    /// Ends the session and returns its record. Idle sessions produce nothing.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<HistoryRecord> {
        let (start, duration_seconds) = match *self {
            TimerSession::Idle => return None,
            TimerSession::Running { origin } => (Some(origin), whole_seconds_between(origin, now)),
            TimerSession::Paused { elapsed_seconds } => (None, elapsed_seconds),
        };
        *self = TimerSession::Idle;
        debug!("Timer stopped after {duration_seconds}s");

        Some(HistoryRecord {
            id: EntryId::generate(),
            start,
            end: now,
            duration_seconds,
            saved_category_id: None,
        })
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        match *self {
            TimerSession::Idle => 0,
            TimerSession::Running { origin } => whole_seconds_between(origin, now),
            TimerSession::Paused { elapsed_seconds } => elapsed_seconds,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TimerSession::Running { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimerSession::Idle => "Idle",
            TimerSession::Running { .. } => "Running",
            TimerSession::Paused { .. } => "Paused",
        }
    }

    /// Live readout such as `Running 2m 5s`.
    pub fn display(&self, now: DateTime<Utc>) -> String {
        format!("{} {}", self.label(), format_seconds(self.elapsed_seconds(now)))
    }
}

fn backdate(now: DateTime<Utc>, seconds: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(seconds).ok()?;
    now.checked_sub_signed(TimeDelta::try_seconds(seconds)?)
}

/// Seconds between two instants at one second resolution, `floor(to) - floor(from)`.
fn whole_seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to.timestamp() - from.timestamp()).max(0) as u64
}

/// On-disk shape of [TimerSession]. Any combination of fields is accepted and normalised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TimerSessionEntity {
    running: bool,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    start_at: Option<DateTime<Utc>>,
    elapsed_seconds: u64,
}

impl From<TimerSessionEntity> for TimerSession {
    fn from(value: TimerSessionEntity) -> Self {
        match value {
            TimerSessionEntity {
                running: true,
                start_at: Some(origin),
                ..
            } => TimerSession::Running { origin },
            TimerSessionEntity {
                elapsed_seconds, ..
            } if elapsed_seconds > MAX_ELAPSED_SECONDS => {
                warn!("Stored timer holds {elapsed_seconds}s, resetting it");
                TimerSession::Idle
            }
            TimerSessionEntity {
                elapsed_seconds, ..
            } if elapsed_seconds > 0 => TimerSession::Paused { elapsed_seconds },
            _ => TimerSession::Idle,
        }
    }
}

impl From<TimerSession> for TimerSessionEntity {
    fn from(value: TimerSession) -> Self {
        match value {
            TimerSession::Idle => TimerSessionEntity::default(),
            TimerSession::Running { origin } => TimerSessionEntity {
                running: true,
                start_at: Some(origin),
                elapsed_seconds: 0,
            },
            TimerSession::Paused { elapsed_seconds } => TimerSessionEntity {
                running: false,
                start_at: None,
                elapsed_seconds,
            },
        }
    }
}

/// Immutable result of a stopped timer. Only `saved_category_id` ever changes, once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: EntryId,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
    pub duration_seconds: u64,
    #[serde(default)]
    pub saved_category_id: Option<CategoryId>,
}

impl HistoryRecord {
    /// Minutes credited to a category when this record is assigned, never less than one.
    pub fn credited_minutes(&self) -> u32 {
        let minutes = (self.duration_seconds as f64 / 60.).round() as u32;
        minutes.max(1)
    }

    pub fn is_assigned(&self) -> bool {
        self.saved_category_id.is_some()
    }
}

/// Newest first list of [HistoryRecord]s capped at [HISTORY_LIMIT].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerHistory {
    records: Vec<HistoryRecord>,
}

impl TimerHistory {
    pub fn push(&mut self, record: HistoryRecord) {
        self.records.insert(0, record);
        self.records.truncate(HISTORY_LIMIT);
    }

    pub fn get(&self, id: &EntryId) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub(super) fn get_mut(&mut self, id: &EntryId) -> Option<&mut HistoryRecord> {
        self.records.iter_mut().find(|r| &r.id == id)
    }

    pub fn remove(&mut self, id: &EntryId) -> Option<HistoryRecord> {
        let index = self.records.iter().position(|r| &r.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Enforces the cap and unique ids on lists that came from storage.
    pub fn normalized(mut self) -> Self {
        let mut seen = HashSet::new();
        self.records.retain(|r| seen.insert(r.id.clone()));
        self.records.truncate(HISTORY_LIMIT);
        self
    }
}
