//! Recurring-task (habit) records.
//!
//! Habits store a recurrence pattern and reminder time but are never
//! expanded into task instances; they are an independent collection with
//! no relationship to [`crate::task::Task`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{Priority, UserId};

/// Unique identifier for a habit, based on UUID v7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HabitId(Uuid);

impl HabitId {
    /// Creates a new time-ordered habit identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `HabitId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HabitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How often a habit recurs. Stored only, never expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A recurring task owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub owner: UserId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Priority,
    /// Local time of day the reminder fires.
    pub reminder_time: NaiveTime,
    pub recurrence: RecurrencePattern,
    /// First day the habit applies.
    pub start_date: NaiveDate,
    /// Paused habits keep their schedule but stop reminding.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting a habit. Id, owner, and timestamps are assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHabit {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Priority,
    pub reminder_time: NaiveTime,
    pub recurrence: RecurrencePattern,
    pub start_date: NaiveDate,
}

/// Partial update for a habit. `None` fields are left untouched; the
/// nullable columns use `Option<Option<_>>` so `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub reminder_time: Option<NaiveTime>,
    pub recurrence: Option<RecurrencePattern>,
    pub start_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

impl HabitPatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.reminder_time.is_none()
            && self.recurrence.is_none()
            && self.start_date.is_none()
            && self.active.is_none()
    }

    /// Applies the patch in place. Does not stamp `updated_at`; the store
    /// owns timestamps.
    pub fn apply(&self, habit: &mut Habit) {
        if let Some(title) = &self.title {
            habit.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            habit.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            habit.category.clone_from(category);
        }
        if let Some(priority) = self.priority {
            habit.priority = priority;
        }
        if let Some(reminder_time) = self.reminder_time {
            habit.reminder_time = reminder_time;
        }
        if let Some(recurrence) = self.recurrence {
            habit.recurrence = recurrence;
        }
        if let Some(start_date) = self.start_date {
            habit.start_date = start_date;
        }
        if let Some(active) = self.active {
            habit.active = active;
        }
    }

    /// Patch that only flips the active flag.
    #[must_use]
    pub fn set_active(active: bool) -> Self {
        Self {
            active: Some(active),
            ..Self::default()
        }
    }
}
