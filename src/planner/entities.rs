use std::fmt::Display;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Stable identifier of a [Category]. Derived from the category name when it is created and never
/// changed afterwards, renames included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of tasks, manual entries and timer history records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub target_hours: f64,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>, target_hours: f64) -> Self {
        Self {
            id,
            name: name.into(),
            target_hours: sanitize_hours(target_hours),
        }
    }

    /// Daily goal in whole minutes.
    pub fn target_minutes(&self) -> u64 {
        (sanitize_hours(self.target_hours) * 60.).round() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntryId,
    pub title: String,
    pub minutes: u32,
    pub category_id: CategoryId,
    #[serde(default)]
    pub completed: bool,
}

/// Flat contribution of finished time that isn't tied to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntry {
    pub id: EntryId,
    pub category_id: CategoryId,
    pub minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub show_seconds: bool,
}

/// Negative, NaN and infinite targets all collapse to zero.
pub fn sanitize_hours(hours: f64) -> f64 {
    if hours.is_finite() && hours > 0. {
        hours
    } else {
        0.
    }
}

/// Lower-cases `name` and replaces every run of characters outside `[a-z0-9]` with a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
            in_separator = false;
        } else if !in_separator {
            slug.push('-');
            in_separator = true;
        }
    }
    slug
}

/// Produces an id for a new category named `name` that doesn't clash with `existing`.
pub fn category_id_for<'a>(
    name: &str,
    existing: impl Iterator<Item = &'a CategoryId> + Clone,
) -> CategoryId {
    let base = slugify(name);
    let taken = |candidate: &str| existing.clone().any(|id| id.as_str() == candidate);

    let mut candidate = if base.is_empty() {
        format!("cat-{}", Utc::now().timestamp_millis())
    } else {
        base.clone()
    };
    let mut suffix = 1;
    while taken(&candidate) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    CategoryId::new(candidate)
}

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new(CategoryId::new("work"), "Work", 6.),
        Category::new(CategoryId::new("study"), "Study", 8.),
    ]
}
