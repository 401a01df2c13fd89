//! Task record types for the `tasks` collection.
//!
//! A [`Task`] is the canonical record shape shared by the client and the
//! store backend. Inserts go through [`NewTask`] (the store assigns id,
//! owner, and timestamps) and partial updates through [`TaskPatch`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TITLE_LENGTH: usize = 256;

/// Unique identifier for a task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identity of the owning session's user.
///
/// Assigned by the store backend when a session authenticates. Every
/// write to the `tasks` and `recurring_tasks` collections is scoped to
/// the owner recorded here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a user identity from a string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this user identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion status of a task.
///
/// `status` is the single canonical completion field. Both transitions
/// are reversible; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is open and visible in the main list.
    Active,
    /// Task has been checked off.
    Completed,
}

impl TaskStatus {
    /// Returns the opposite status, used by completion toggling.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Completed,
            Self::Completed => Self::Active,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Priority of a task or habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Needs attention first.
    High,
    /// Default priority.
    Medium,
    /// Can wait.
    Low,
}

impl Priority {
    /// Numeric rank for sorting; higher means more urgent.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Errors raised by record validation, before any remote call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty after trimming whitespace.
    #[error("title cannot be empty")]
    TitleEmpty,
    /// Title exceeds [`MAX_TITLE_LENGTH`] characters.
    #[error("title too long (max {MAX_TITLE_LENGTH} characters)")]
    TitleTooLong,
}

/// Validates a raw title and returns it trimmed.
///
/// # Errors
///
/// Returns [`ValidationError::TitleEmpty`] if nothing remains after
/// trimming, or [`ValidationError::TitleTooLong`] past [`MAX_TITLE_LENGTH`]
/// characters.
pub fn validate_title(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(trimmed)
}

/// A user-created to-do item with an optional embedded checklist.
///
/// The `description` field carries either a serialized checklist (see
/// [`crate::checklist`]), a legacy plain-text note, or nothing.
/// `completion_percentage` is a cached projection of the checklist and is
/// recomputed on every checklist mutation; the checklist tree is the
/// source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier, assigned by the store at insert.
    pub id: TaskId,
    /// Identity of the owning user, attached by the store.
    pub owner: UserId,
    /// Non-empty display title.
    pub title: String,
    /// Serialized checklist, legacy plain text, or absent.
    pub description: Option<String>,
    /// Canonical completion status.
    pub status: TaskStatus,
    /// Task priority.
    pub priority: Priority,
    /// Optional free-form category label.
    pub category: Option<String>,
    /// Optional due timestamp.
    pub due_date: Option<DateTime<Utc>>,
    /// Cached checklist completion, 0..=100.
    pub completion_percentage: u8,
    /// When the record was inserted (store clock).
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
    /// Set when `status` transitions to `Completed`, cleared on revert.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Checks the completion invariant: `completed_at` is present if and
    /// only if the task is completed.
    #[must_use]
    pub const fn completed_at_matches_status(&self) -> bool {
        self.completed_at.is_some() == matches!(self.status, TaskStatus::Completed)
    }
}

/// Insert payload for the `tasks` collection.
///
/// The store assigns `id`, `owner`, `created_at`/`updated_at`, and
/// normalizes `completion_percentage` from the description. New tasks
/// always start `Active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    /// Non-empty display title (validate with [`validate_title`]).
    pub title: String,
    /// Serialized checklist or plain text, if any.
    pub description: Option<String>,
    /// Task priority.
    pub priority: Priority,
    /// Optional free-form category label.
    pub category: Option<String>,
    /// Optional due timestamp.
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update for a task record.
///
/// `None` leaves a field untouched; for nullable columns the inner
/// `Option` distinguishes "set to this value" from "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title, if changing.
    pub title: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New status, if changing.
    pub status: Option<TaskStatus>,
    /// New priority, if changing.
    pub priority: Option<Priority>,
    /// New category; `Some(None)` clears it.
    pub category: Option<Option<String>>,
    /// New due date; `Some(None)` clears it.
    pub due_date: Option<Option<DateTime<Utc>>>,
    /// New completion timestamp; `Some(None)` clears it.
    pub completed_at: Option<Option<DateTime<Utc>>>,
    /// New cached completion percentage.
    pub completion_percentage: Option<u8>,
    /// Write timestamp supplied by the mutating client.
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.due_date.is_none()
            && self.completed_at.is_none()
            && self.completion_percentage.is_none()
            && self.updated_at.is_none()
    }

    /// Applies the patch to a task in place.
    ///
    /// Shared by every store implementation so local and remote merges
    /// cannot drift apart.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(category) = &self.category {
            task.category.clone_from(category);
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = completed_at;
        }
        if let Some(percentage) = self.completion_percentage {
            task.completion_percentage = percentage;
        }
        if let Some(updated_at) = self.updated_at {
            task.updated_at = updated_at;
        }
    }
}

/// Ordering applied by `list` reads of the `tasks` collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOrder {
    /// Newest first (default list view).
    #[default]
    CreatedDesc,
    /// Soonest due date first; tasks without one sort last.
    DueAsc,
    /// High priority first.
    PriorityDesc,
}

impl TaskOrder {
    /// Sorts a task slice in place according to this ordering.
    pub fn sort(self, tasks: &mut [Task]) {
        match self {
            Self::CreatedDesc => {
                tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            Self::DueAsc => {
                tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => b.created_at.cmp(&a.created_at),
                });
            }
            Self::PriorityDesc => {
                tasks.sort_by(|a, b| {
                    b.priority
                        .rank()
                        .cmp(&a.priority.rank())
                        .then_with(|| b.created_at.cmp(&a.created_at))
                });
            }
        }
    }
}
