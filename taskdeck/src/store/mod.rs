//! Remote store abstraction for `TaskDeck`.
//!
//! Defines the [`RemoteStore`] trait that all store implementations must
//! satisfy. Concrete implementations include:
//! - [`memory::MemoryStore`] — in-process store for testing and offline use
//! - [`remote::WsStore`] — WebSocket client for a hosted store backend
//! - [`retry::RetryingStore`] — decorator retrying transient failures

pub mod memory;
pub mod remote;
pub mod retry;

use taskdeck_model::habit::{Habit, HabitId, HabitPatch, NewHabit};
use taskdeck_model::task::{NewTask, Task, TaskId, TaskOrder, TaskPatch, UserId};
use taskdeck_model::wire::{StoreFault, WireError};

/// An authenticated store session.
///
/// Produced by the store implementation once the connection handshake
/// resolves a user identity. Every record the session reads or writes is
/// scoped to this user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The authenticated user's identity.
    pub user: UserId,
}

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No session is established, or the handshake was refused.
    #[error("not authenticated")]
    Unauthenticated,

    /// The record does not exist (or belongs to another owner).
    #[error("{0} not found")]
    NotFound(String),

    /// The store understood the request but rejected it.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The connection to the store has been closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The operation timed out before completing.
    #[error("store operation timed out")]
    Timeout,

    /// Wire encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// An underlying I/O error occurred.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether the error is transport-level and worth retrying.
    ///
    /// Validation and not-found errors are deterministic and never
    /// transient.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::Timeout | Self::Io(_)
        )
    }
}

impl From<WireError> for StoreError {
    fn from(err: WireError) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<StoreFault> for StoreError {
    fn from(fault: StoreFault) -> Self {
        match fault {
            StoreFault::Unauthenticated => Self::Unauthenticated,
            StoreFault::NotFound { what } => Self::NotFound(what),
            StoreFault::Rejected { reason } => Self::Rejected(reason),
        }
    }
}

/// Async store trait for owner-scoped task and habit persistence.
///
/// Implementations own the session lifecycle: controllers never see
/// tokens, only the resolved [`Session`]. All writes return the stored
/// record as the backend normalized it.
pub trait RemoteStore: Send + Sync {
    /// Returns the current session, or `None` before authentication.
    fn current_session(&self) -> Option<Session>;

    /// Lists the session user's tasks in the given order.
    fn list_tasks(
        &self,
        order: TaskOrder,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, StoreError>> + Send;

    /// Inserts a task and returns the stored record.
    fn insert_task(
        &self,
        task: NewTask,
    ) -> impl std::future::Future<Output = Result<Task, StoreError>> + Send;

    /// Applies a partial update and returns the updated record.
    fn update_task(
        &self,
        id: &TaskId,
        patch: TaskPatch,
    ) -> impl std::future::Future<Output = Result<Task, StoreError>> + Send;

    /// Deletes the given tasks in one batch request.
    fn delete_tasks(
        &self,
        ids: &[TaskId],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Lists the session user's habits.
    fn list_habits(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Habit>, StoreError>> + Send;

    /// Inserts a habit and returns the stored record.
    fn insert_habit(
        &self,
        habit: NewHabit,
    ) -> impl std::future::Future<Output = Result<Habit, StoreError>> + Send;

    /// Applies a partial update and returns the updated record.
    fn update_habit(
        &self,
        id: &HabitId,
        patch: HabitPatch,
    ) -> impl std::future::Future<Output = Result<Habit, StoreError>> + Send;

    /// Deletes one habit.
    fn delete_habit(
        &self,
        id: &HabitId,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// A shared store handle is itself a store, so one connection can back
/// several controllers.
impl<S: RemoteStore> RemoteStore for std::sync::Arc<S> {
    fn current_session(&self) -> Option<Session> {
        S::current_session(self)
    }

    async fn list_tasks(&self, order: TaskOrder) -> Result<Vec<Task>, StoreError> {
        S::list_tasks(self, order).await
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        S::insert_task(self, task).await
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        S::update_task(self, id, patch).await
    }

    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<(), StoreError> {
        S::delete_tasks(self, ids).await
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, StoreError> {
        S::list_habits(self).await
    }

    async fn insert_habit(&self, habit: NewHabit) -> Result<Habit, StoreError> {
        S::insert_habit(self, habit).await
    }

    async fn update_habit(&self, id: &HabitId, patch: HabitPatch) -> Result<Habit, StoreError> {
        S::update_habit(self, id, patch).await
    }

    async fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError> {
        S::delete_habit(self, id).await
    }
}
