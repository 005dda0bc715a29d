use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::utils::percentage::{progress_percentage, Percentage};

use super::{
    day_window::{DayWindow, DayWindowConfig, ReminderLevel},
    entities::{Category, CategoryId, ManualEntry, Task},
};

/// Per category accounting for the current window.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub category_id: CategoryId,
    pub name: String,
    pub target_minutes: u64,
    pub done_minutes: u64,
    pub planned_remaining_minutes: u64,
    pub needed_minutes: u64,
    pub progress: Percentage,
}

/// Everything the front end shows about the current day. Always recomputed from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    pub now: DateTime<Utc>,
    pub window: DayWindow,
    pub minutes_left: u64,
    pub categories: Vec<CategoryStats>,
    pub total_needed: u64,
    pub total_planned_remaining: u64,
    /// The larger of what targets still require and what incomplete tasks already schedule.
    pub workload_minutes: u64,
    pub can_finish: bool,
    /// Latest moment work could begin and still end by the window end with zero slack.
    pub latest_start: DateTime<Utc>,
    pub reminder: ReminderLevel,
}

#[derive(Default)]
struct Tally {
    done: u64,
    planned_remaining: u64,
}

impl Workload {
    pub fn compute(
        now: DateTime<Utc>,
        config: &DayWindowConfig,
        categories: &[Category],
        tasks: &[Task],
        manual_entries: &[ManualEntry],
    ) -> Self {
        let window = DayWindow::containing(now, config);
        let minutes_left = window.minutes_left(now);

        let mut tallies = HashMap::<&CategoryId, Tally>::new();
        for task in tasks {
            let tally = tallies.entry(&task.category_id).or_default();
            if task.completed {
                tally.done = tally.done.saturating_add(u64::from(task.minutes));
            } else {
                tally.planned_remaining = tally
                    .planned_remaining
                    .saturating_add(u64::from(task.minutes));
            }
        }
        for entry in manual_entries {
            let tally = tallies.entry(&entry.category_id).or_default();
            tally.done = tally.done.saturating_add(u64::from(entry.minutes));
        }

        let categories = categories
            .iter()
            .map(|category| {
                let tally = tallies.get(&category.id);
                let done_minutes = tally.map_or(0, |t| t.done);
                let planned_remaining_minutes = tally.map_or(0, |t| t.planned_remaining);
                let target_minutes = category.target_minutes();
                CategoryStats {
                    category_id: category.id.clone(),
                    name: category.name.clone(),
                    target_minutes,
                    done_minutes,
                    planned_remaining_minutes,
                    needed_minutes: target_minutes.saturating_sub(done_minutes),
                    progress: progress_percentage(done_minutes, target_minutes),
                }
            })
            .collect::<Vec<_>>();

        let total_needed = saturating_total(categories.iter().map(|c| c.needed_minutes));
        let total_planned_remaining =
            saturating_total(categories.iter().map(|c| c.planned_remaining_minutes));
        // Taken globally, not per category: surplus planning in one category never offsets
        // another category's shortfall, but a large planned total can hide a smaller need.
        let workload_minutes = total_needed.max(total_planned_remaining);

        Self {
            now,
            window,
            minutes_left,
            categories,
            total_needed,
            total_planned_remaining,
            workload_minutes,
            can_finish: workload_minutes <= minutes_left,
            latest_start: latest_start(window.end, workload_minutes),
            reminder: ReminderLevel::from_minutes_left(minutes_left),
        }
    }

    pub fn hours_left(&self) -> f64 {
        self.minutes_left as f64 / 60.
    }

    pub fn category(&self, id: &CategoryId) -> Option<&CategoryStats> {
        self.categories.iter().find(|c| &c.category_id == id)
    }
}

fn saturating_total(minutes: impl Iterator<Item = u64>) -> u64 {
    minutes.fold(0, u64::saturating_add)
}

/// `end - workload`, or the earliest representable instant when the workload reaches further back
/// than chrono can express.
fn latest_start(end: DateTime<Utc>, workload_minutes: u64) -> DateTime<Utc> {
    i64::try_from(workload_minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .and_then(|workload| end.checked_sub_signed(workload))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
