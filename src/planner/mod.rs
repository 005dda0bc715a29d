//! The time accounting core. [Planner] owns the whole state tree and exposes every user intent
//! as a synchronous method. Derived values come from [Planner::workload], which recomputes
//! everything for the given instant.

pub mod day_window;
pub mod entities;
pub mod error;
pub mod prompt;
pub mod timer;
pub mod workload;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use day_window::{parse_time_zone, DayStart, DayWindowConfig};
use entities::{
    category_id_for, default_categories, sanitize_hours, Category, CategoryId, EntryId,
    ManualEntry, Preferences, Task,
};
use error::AssignError;
use prompt::CategoryPrompt;
use timer::{HistoryRecord, TimerHistory, TimerSession};
use workload::Workload;

/// Plain data behind a [Planner]. This is what gets persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerState {
    pub config: DayWindowConfig,
    pub preferences: Preferences,
    pub categories: Vec<Category>,
    pub tasks: Vec<Task>,
    pub manual_entries: Vec<ManualEntry>,
    pub timer: TimerSession,
    pub history: TimerHistory,
}

impl Default for PlannerState {
    fn default() -> Self {
        Self {
            config: DayWindowConfig::default(),
            preferences: Preferences::default(),
            categories: default_categories(),
            tasks: Vec::new(),
            manual_entries: Vec::new(),
            timer: TimerSession::default(),
            history: TimerHistory::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Planner {
    state: PlannerState,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a planner from possibly inconsistent stored data. Duplicate ids keep their first
    /// occurrence, entries pointing at missing categories are dropped and every numeric field is
    /// clamped back into range.
    pub fn restore(mut state: PlannerState) -> Self {
        state.config.day_start = state.config.day_start.normalized();

        let mut seen = HashSet::new();
        state
            .categories
            .retain(|category| seen.insert(category.id.clone()));
        for category in state.categories.iter_mut() {
            category.target_hours = sanitize_hours(category.target_hours);
        }

        let known = state
            .categories
            .iter()
            .map(|c| c.id.clone())
            .collect::<HashSet<_>>();
        let tasks_before = state.tasks.len();
        let entries_before = state.manual_entries.len();
        let mut seen = HashSet::new();
        state.tasks.retain(|t| {
            known.contains(&t.category_id) && t.minutes >= 1 && seen.insert(t.id.clone())
        });
        let mut seen = HashSet::new();
        state.manual_entries.retain(|e| {
            known.contains(&e.category_id) && e.minutes >= 1 && seen.insert(e.id.clone())
        });
        let dropped =
            tasks_before - state.tasks.len() + entries_before - state.manual_entries.len();
        if dropped > 0 {
            warn!("Dropped {dropped} stored tasks or entries that were invalid or duplicated");
        }

        state.history = state.history.normalized();
        Self { state }
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn config(&self) -> &DayWindowConfig {
        &self.state.config
    }

    pub fn preferences(&self) -> &Preferences {
        &self.state.preferences
    }

    pub fn categories(&self) -> &[Category] {
        &self.state.categories
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn manual_entries(&self) -> &[ManualEntry] {
        &self.state.manual_entries
    }

    pub fn timer(&self) -> &TimerSession {
        &self.state.timer
    }

    pub fn history(&self) -> &TimerHistory {
        &self.state.history
    }

    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.state.categories.iter().find(|c| &c.id == id)
    }

    fn has_category(&self, id: &CategoryId) -> bool {
        self.category(id).is_some()
    }

    pub fn workload(&self, now: DateTime<Utc>) -> Workload {
        Workload::compute(
            now,
            &self.state.config,
            &self.state.categories,
            &self.state.tasks,
            &self.state.manual_entries,
        )
    }

    // Categories

    /// Adds a category with a one hour target. Blank names become "New".
    pub fn add_category(&mut self, name: &str) -> CategoryId {
        let name = match name.trim() {
            "" => "New",
            trimmed => trimmed,
        };
        let id = category_id_for(name, self.state.categories.iter().map(|c| &c.id));
        info!("Adding category {id} ({name})");
        self.state
            .categories
            .push(Category::new(id.clone(), name, 1.));
        id
    }

    /// Removes a category together with every task and manual entry that references it.
    pub fn remove_category(&mut self, id: &CategoryId) -> bool {
        let before = self.state.categories.len();
        self.state.categories.retain(|c| &c.id != id);
        if self.state.categories.len() == before {
            return false;
        }
        self.state.tasks.retain(|t| &t.category_id != id);
        self.state.manual_entries.retain(|e| &e.category_id != id);
        info!("Removed category {id}");
        true
    }

    pub fn rename_category(&mut self, id: &CategoryId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.state.categories.iter_mut().find(|c| &c.id == id) {
            Some(category) => {
                category.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_category_target(&mut self, id: &CategoryId, hours: f64) -> bool {
        match self.state.categories.iter_mut().find(|c| &c.id == id) {
            Some(category) => {
                category.target_hours = sanitize_hours(hours);
                debug!("Target of {id} set to {}h", category.target_hours);
                true
            }
            None => false,
        }
    }

    // Tasks and manual entries

    pub fn add_task(
        &mut self,
        title: &str,
        minutes: i64,
        category_id: &CategoryId,
    ) -> Option<EntryId> {
        let title = title.trim();
        if title.is_empty() || minutes < 1 || !self.has_category(category_id) {
            return None;
        }
        let id = EntryId::generate();
        self.state.tasks.push(Task {
            id: id.clone(),
            title: title.to_string(),
            minutes: clamp_minutes(minutes),
            category_id: category_id.clone(),
            completed: false,
        });
        Some(id)
    }

    pub fn toggle_task(&mut self, id: &EntryId) -> bool {
        match self.state.tasks.iter_mut().find(|t| &t.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        }
    }

    pub fn delete_task(&mut self, id: &EntryId) -> bool {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|t| &t.id != id);
        self.state.tasks.len() != before
    }

    pub fn add_manual_entry(&mut self, category_id: &CategoryId, minutes: i64) -> Option<EntryId> {
        if minutes < 1 || !self.has_category(category_id) {
            return None;
        }
        Some(self.push_manual_entry(category_id, clamp_minutes(minutes)).id)
    }

    fn push_manual_entry(&mut self, category_id: &CategoryId, minutes: u32) -> ManualEntry {
        let entry = ManualEntry {
            id: EntryId::generate(),
            category_id: category_id.clone(),
            minutes,
        };
        debug!("Logged {minutes}m to {category_id}");
        self.state.manual_entries.push(entry.clone());
        entry
    }

    pub fn delete_manual_entry(&mut self, id: &EntryId) -> bool {
        let before = self.state.manual_entries.len();
        self.state.manual_entries.retain(|e| &e.id != id);
        self.state.manual_entries.len() != before
    }

    // Configuration

    pub fn set_day_start(&mut self, hour: i64, minute: i64) {
        self.state.config.day_start = DayStart::new(hour, minute);
    }

    pub fn set_time_zone(&mut self, name: &str) -> bool {
        match parse_time_zone(name) {
            Some(zone) => {
                self.state.config.time_zone = zone;
                true
            }
            None => false,
        }
    }

    pub fn set_show_seconds(&mut self, show_seconds: bool) {
        self.state.preferences.show_seconds = show_seconds;
    }

    // Timer

    pub fn start_timer(&mut self, now: DateTime<Utc>) {
        self.state.timer.start(now);
    }

    pub fn pause_timer(&mut self, now: DateTime<Utc>) {
        self.state.timer.pause(now);
    }

    /// Stops the timer and files the resulting record at the top of the history.
    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Option<HistoryRecord> {
        let record = self.state.timer.stop(now)?;
        info!(
            "Recorded timer session {} of {}s",
            record.id, record.duration_seconds
        );
        self.state.history.push(record.clone());
        Some(record)
    }

    pub fn delete_record(&mut self, id: &EntryId) -> bool {
        self.state.history.remove(id).is_some()
    }

    /// Credits a history record to `category_id` as a manual entry. This is the only way timer
    /// time reaches the workload numbers.
    pub fn assign_record(
        &mut self,
        record_id: &EntryId,
        category_id: &CategoryId,
    ) -> Result<ManualEntry, AssignError> {
        let minutes = self.assignable_record(record_id)?.credited_minutes();
        if !self.has_category(category_id) {
            return Err(AssignError::UnknownCategory(category_id.clone()));
        }

        let entry = self.push_manual_entry(category_id, minutes);
        if let Some(record) = self.state.history.get_mut(record_id) {
            record.saved_category_id = Some(category_id.clone());
        }
        info!("Saved {minutes}m from record {record_id} to {category_id}");
        Ok(entry)
    }

    /// Same as [Planner::assign_record] but lets `prompt` pick the category. A cancelled prompt
    /// yields `Ok(None)` and leaves everything untouched.
    pub fn assign_with_prompt(
        &mut self,
        record_id: &EntryId,
        prompt: &mut impl CategoryPrompt,
    ) -> Result<Option<ManualEntry>, AssignError> {
        let record = self.assignable_record(record_id)?.clone();
        match prompt.choose_category(&record, &self.state.categories) {
            Some(category_id) => self.assign_record(record_id, &category_id).map(Some),
            None => {
                debug!("Assignment of {record_id} cancelled");
                Ok(None)
            }
        }
    }

    fn assignable_record(&self, record_id: &EntryId) -> Result<&HistoryRecord, AssignError> {
        let record = self
            .state
            .history
            .get(record_id)
            .ok_or_else(|| AssignError::NotFound(record_id.clone()))?;
        if record.is_assigned() {
            return Err(AssignError::AlreadyAssigned(record_id.clone()));
        }
        if self.state.categories.is_empty() {
            return Err(AssignError::NoCategoriesExist);
        }
        Ok(record)
    }
}

fn clamp_minutes(minutes: i64) -> u32 {
    minutes.clamp(1, i64::from(u32::MAX)) as u32
}
