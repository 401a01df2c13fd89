//! Task application layer.
//!
//! Contains the [`controller::TaskController`], which owns the in-memory
//! task map and runs every mutation through the optimistic pipeline:
//! apply locally, write remotely, roll back on failure.

pub mod controller;
pub mod query;

use chrono::{DateTime, Utc};

use taskdeck_model::checklist::{ChecklistError, DraftEntry};
use taskdeck_model::task::{Priority, TaskId, ValidationError};

use crate::store::StoreError;

/// Errors that can occur during task controller operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Input validation failed; no local or remote state changed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The task is not present in the local map.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// A subtask lookup inside a task's checklist failed.
    #[error(transparent)]
    Checklist(#[from] ChecklistError),

    /// The remote write failed; local state has been rolled back.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Events emitted by the [`controller::TaskController`] for UI notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A task transitioned from active to completed.
    ///
    /// Emitted exactly once per forward transition, at optimistic apply
    /// time, and never when a completion is reverted. The UI celebration
    /// hook listens for this.
    TaskCompleted {
        /// The task that was completed.
        id: TaskId,
    },
    /// The local map was replaced by a full reload from the store.
    Refreshed,
}

/// Input of the task-creation form.
///
/// The flat `entries` sequence is grouped into checklist sections by
/// [`taskdeck_model::checklist::Checklist::from_draft`].
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    /// Raw task name; trimmed and validated before any remote call.
    pub name: String,
    /// Flat heading/subtask lines in form order.
    pub entries: Vec<DraftEntry>,
    /// Task priority.
    pub priority: Priority,
    /// Optional category label.
    pub category: Option<String>,
    /// Optional due timestamp.
    pub due_date: Option<DateTime<Utc>>,
}
