//! Retrying decorator for any [`RemoteStore`].
//!
//! Retry policy lives here, at the store boundary, never in the
//! controllers: a controller sees exactly one success or one failure per
//! operation. Only transport-class errors are retried; validation and
//! not-found failures are deterministic and surface immediately.

use std::future::Future;
use std::time::Duration;

use taskdeck_model::habit::{Habit, HabitId, HabitPatch, NewHabit};
use taskdeck_model::task::{NewTask, Task, TaskId, TaskOrder, TaskPatch};

use super::{RemoteStore, Session, StoreError};

/// Configuration for transient-failure retry behavior.
#[derive(Debug, Clone)]
pub struct StoreRetryConfig {
    /// Number of retries after the initial attempt.
    pub retries: u32,
    /// Base delay between attempts; attempt `n` waits `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for StoreRetryConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Store decorator that retries transient failures with linear backoff.
pub struct RetryingStore<S> {
    inner: S,
    config: StoreRetryConfig,
}

impl<S: RemoteStore> RetryingStore<S> {
    /// Wraps a store with the given retry policy.
    pub const fn new(inner: S, config: StoreRetryConfig) -> Self {
        Self { inner, config }
    }

    /// Returns the wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.config.retries => {
                    attempt += 1;
                    let delay = self.config.base_delay * attempt;
                    tracing::debug!(
                        op,
                        attempt,
                        max_retries = self.config.retries,
                        error = %err,
                        "transient store failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl<S: RemoteStore> RemoteStore for RetryingStore<S> {
    fn current_session(&self) -> Option<Session> {
        self.inner.current_session()
    }

    async fn list_tasks(&self, order: TaskOrder) -> Result<Vec<Task>, StoreError> {
        self.with_retry("list_tasks", || self.inner.list_tasks(order))
            .await
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.with_retry("insert_task", || self.inner.insert_task(task.clone()))
            .await
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        self.with_retry("update_task", || self.inner.update_task(id, patch.clone()))
            .await
    }

    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<(), StoreError> {
        self.with_retry("delete_tasks", || self.inner.delete_tasks(ids))
            .await
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, StoreError> {
        self.with_retry("list_habits", || self.inner.list_habits())
            .await
    }

    async fn insert_habit(&self, habit: NewHabit) -> Result<Habit, StoreError> {
        self.with_retry("insert_habit", || self.inner.insert_habit(habit.clone()))
            .await
    }

    async fn update_habit(&self, id: &HabitId, patch: HabitPatch) -> Result<Habit, StoreError> {
        self.with_retry("update_habit", || {
            self.inner.update_habit(id, patch.clone())
        })
        .await
    }

    async fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError> {
        self.with_retry("delete_habit", || self.inner.delete_habit(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use taskdeck_model::task::Priority;

    fn fast_config(retries: u32) -> StoreRetryConfig {
        StoreRetryConfig {
            retries,
            base_delay: Duration::from_millis(1),
        }
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            priority: Priority::Medium,
            category: None,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let inner = MemoryStore::new("alice");
        inner.fail_next_list(StoreError::Timeout).await;
        let store = RetryingStore::new(inner, fast_config(2));

        let tasks = store.list_tasks(TaskOrder::CreatedDesc).await.unwrap();
        assert!(tasks.is_empty());
        assert_eq!(store.inner().list_calls(), 2);
    }

    #[tokio::test]
    async fn retries_exhausted_returns_last_error() {
        let inner = MemoryStore::new("alice");
        inner.fail_next_list(StoreError::Timeout).await;
        inner.fail_next_list(StoreError::ConnectionClosed).await;
        let store = RetryingStore::new(inner, fast_config(1));

        let err = store.list_tasks(TaskOrder::CreatedDesc).await.unwrap_err();
        assert!(matches!(err, StoreError::ConnectionClosed));
        assert_eq!(store.inner().list_calls(), 2);
    }

    #[tokio::test]
    async fn deterministic_errors_are_not_retried() {
        let inner = MemoryStore::new("alice");
        let store = RetryingStore::new(inner, fast_config(3));

        let err = store
            .update_task(&TaskId::new(), TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.inner().update_calls(), 1);
    }

    #[tokio::test]
    async fn insert_retried_then_succeeds() {
        let inner = MemoryStore::new("alice");
        inner.fail_next_insert(StoreError::ConnectionClosed).await;
        let store = RetryingStore::new(inner, fast_config(2));

        let task = store.insert_task(new_task("persistent")).await.unwrap();
        assert_eq!(task.title, "persistent");
        assert_eq!(store.inner().insert_calls(), 2);
    }

    #[tokio::test]
    async fn zero_retries_fails_immediately() {
        let inner = MemoryStore::new("alice");
        inner.fail_next_list(StoreError::Timeout).await;
        let store = RetryingStore::new(inner, fast_config(0));

        let err = store.list_tasks(TaskOrder::CreatedDesc).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout));
        assert_eq!(store.inner().list_calls(), 1);
    }
}
