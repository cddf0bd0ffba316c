// Task model shared by the active and completed lists

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Timestamp layout used for `completedOn` and the clock display
/// (e.g. `3/14/2026, 9:05:07 PM`).
pub const DISPLAY_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// One unit of work
///
/// Serialized with camelCase keys so stored lists keep the
/// `{title, description, id, completedOn}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<String>,
}

impl Task {
    pub fn new(id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            id,
            completed_on: None,
        }
    }

    /// True once the task has been moved to the completed list
    pub fn is_completed(&self) -> bool {
        self.completed_on.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Case-insensitive title comparison used for duplicate detection
    pub fn title_matches(&self, title: &str) -> bool {
        normalize_title(&self.title) == normalize_title(title)
    }
}

/// Trimmed, lowercased form of a title
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Pick an id that is unique among `existing`.
///
/// Uses the current epoch milliseconds, bumped past the largest existing id
/// when two tasks are created within the same millisecond. When the largest
/// id is `i64::MAX`, the highest free id below the clock is used instead.
pub fn next_id<'a>(existing: impl IntoIterator<Item = &'a Task>) -> i64 {
    let ids: HashSet<i64> = existing.into_iter().map(|t| t.id).collect();
    let now = now_ms();
    match ids.iter().copied().max() {
        Some(max) if max >= now => max
            .checked_add(1)
            .unwrap_or_else(|| free_id_below(&ids, now)),
        _ => now,
    }
}

fn free_id_below(ids: &HashSet<i64>, start: i64) -> i64 {
    (i64::MIN..start)
        .rev()
        .find(|id| !ids.contains(id))
        .unwrap_or(i64::MIN)
}

/// Current local time rendered with [`DISPLAY_FORMAT`]
pub fn display_now() -> String {
    Local::now().format(DISPLAY_FORMAT).to_string()
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
