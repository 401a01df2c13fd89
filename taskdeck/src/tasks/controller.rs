//! Optimistic task controller.
//!
//! [`TaskController`] owns the single in-memory task map the UI reads
//! from. Every mutation follows the same pipeline: apply locally first so
//! the UI updates immediately, then write to the remote store, and on
//! failure restore exactly the fields that were changed.
//!
//! Rollbacks are revision-guarded: each optimistic apply stamps the entry
//! with a fresh revision, and a rollback only lands if the entry still
//! carries the revision it captured. A stale rollback (the entry was
//! refreshed or re-mutated in the meantime) is skipped and the next
//! refresh reconciles instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};

use taskdeck_model::checklist::{Checklist, SubtaskId};
use taskdeck_model::task::{
    NewTask, Task, TaskId, TaskPatch, TaskStatus, validate_title,
};

use crate::store::RemoteStore;

use super::query::TaskQuery;
use super::{TaskDraft, TaskError, TaskEvent};

/// Process-wide revision source. A global counter means an entry
/// replaced by refresh can never be stamped with a revision an older
/// in-flight mutation is still holding.
static REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    REVISION.fetch_add(1, Ordering::Relaxed)
}

/// A task plus the revision of its last local write.
#[derive(Debug, Clone)]
struct TaskEntry {
    task: Task,
    revision: u64,
}

impl TaskEntry {
    /// Wraps a task, canonicalizing its description so subtask ids are
    /// stable for the entry's lifetime. Legacy plain-text descriptions
    /// get their ids stamped here; the canonical form reaches the store
    /// on the first subtask mutation.
    fn new(mut task: Task) -> Self {
        if task.description.as_deref().is_some_and(|d| !d.is_empty()) {
            task.description = Some(Checklist::decode(task.description.as_deref()).encode());
        }
        Self {
            task,
            revision: next_revision(),
        }
    }
}

/// Fields captured before a completion toggle, for exact restoration.
struct CompletionSnapshot {
    status: TaskStatus,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// Fields captured before a subtask toggle, for exact restoration.
struct SubtaskSnapshot {
    description: Option<String>,
    completion_percentage: u8,
    updated_at: DateTime<Utc>,
}

/// Owns the in-memory task map and runs the optimistic mutation pipeline.
///
/// The map is the only task state the UI sees; reads go through
/// [`snapshot`](Self::snapshot) and [`query`](Self::query). The lock is
/// never held across a remote call, so overlapping mutations interleave
/// at the store boundary and resolve through the revision guard.
pub struct TaskController<S: RemoteStore> {
    store: S,
    entries: Mutex<HashMap<TaskId, TaskEntry>>,
    event_tx: mpsc::Sender<TaskEvent>,
}

impl<S: RemoteStore> TaskController<S> {
    /// Creates a controller over the given store.
    ///
    /// Returns the controller and a receiver for [`TaskEvent`]s that the
    /// UI layer should consume.
    pub fn new(store: S, event_buffer: usize) -> (Self, mpsc::Receiver<TaskEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        let controller = Self {
            store,
            entries: Mutex::new(HashMap::new()),
            event_tx,
        };
        (controller, event_rx)
    }

    /// Returns a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Replaces the local map with a full reload from the store.
    ///
    /// A full replacement, not a merge: the reload absorbs any
    /// server-side normalization and clears entries whose rollbacks were
    /// skipped as stale.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the list call fails; the local map
    /// is left untouched in that case.
    pub async fn refresh(&self) -> Result<(), TaskError> {
        let tasks = self.store.list_tasks(Default::default()).await?;
        let mut entries = self.entries.lock().await;
        entries.clear();
        for task in tasks {
            entries.insert(task.id.clone(), TaskEntry::new(task));
        }
        drop(entries);
        let _ = self.event_tx.try_send(TaskEvent::Refreshed);
        Ok(())
    }

    /// Returns all tasks in the default list order.
    pub async fn snapshot(&self) -> Vec<Task> {
        let entries = self.entries.lock().await;
        let mut tasks: Vec<Task> = entries.values().map(|e| e.task.clone()).collect();
        drop(entries);
        taskdeck_model::task::TaskOrder::default().sort(&mut tasks);
        tasks
    }

    /// Returns the tasks matching a query, filtered and ordered.
    pub async fn query(&self, query: &TaskQuery) -> Vec<Task> {
        let entries = self.entries.lock().await;
        let mut tasks: Vec<Task> = entries.values().map(|e| e.task.clone()).collect();
        drop(entries);
        query.apply(&mut tasks);
        tasks
    }

    /// Returns one task by id, if present locally.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.entries.lock().await.get(id).map(|e| e.task.clone())
    }

    /// Toggles a task between active and completed.
    ///
    /// Applied optimistically: status, `completed_at`, and `updated_at`
    /// flip locally before the remote write. Entering the completed state
    /// emits [`TaskEvent::TaskCompleted`] immediately; the event is not
    /// retracted if the write later fails. On store failure the three
    /// fields are restored exactly as captured, under the revision guard.
    ///
    /// # Errors
    ///
    /// [`TaskError::TaskNotFound`] if the task is not in the local map,
    /// or [`TaskError::Store`] if the remote write fails (after rollback).
    pub async fn toggle_completion(&self, id: &TaskId) -> Result<(), TaskError> {
        let now = Utc::now();
        let (snapshot, guard, new_status, completed_at) = {
            let mut entries = self.entries.lock().await;
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| TaskError::TaskNotFound(id.clone()))?;

            let snapshot = CompletionSnapshot {
                status: entry.task.status,
                completed_at: entry.task.completed_at,
                updated_at: entry.task.updated_at,
            };
            let new_status = entry.task.status.toggled();
            let completed_at = match new_status {
                TaskStatus::Completed => Some(now),
                TaskStatus::Active => None,
            };

            entry.task.status = new_status;
            entry.task.completed_at = completed_at;
            entry.task.updated_at = now;
            entry.revision = next_revision();
            (snapshot, entry.revision, new_status, completed_at)
        };

        if new_status == TaskStatus::Completed {
            let _ = self
                .event_tx
                .try_send(TaskEvent::TaskCompleted { id: id.clone() });
        }

        let patch = TaskPatch {
            status: Some(new_status),
            completed_at: Some(completed_at),
            updated_at: Some(now),
            ..TaskPatch::default()
        };
        match self.store.update_task(id, patch).await {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::warn!(task = %id, error = %err, "completion toggle failed, rolling back");
                let mut entries = self.entries.lock().await;
                match entries.get_mut(id) {
                    Some(entry) if entry.revision == guard => {
                        entry.task.status = snapshot.status;
                        entry.task.completed_at = snapshot.completed_at;
                        entry.task.updated_at = snapshot.updated_at;
                        entry.revision = next_revision();
                    }
                    Some(_) => {
                        tracing::debug!(task = %id, "stale rollback skipped");
                    }
                    None => {}
                }
                Err(err.into())
            }
        }
    }

    /// Sets a subtask's completed flag inside a task's checklist.
    ///
    /// Decodes the stored description, flips the flag, recomputes the
    /// completion percentage, and re-encodes, all applied optimistically.
    /// On store failure the description, percentage, and `updated_at` are
    /// restored exactly (revision-guarded). On success a best-effort
    /// refresh absorbs any server-side normalization.
    ///
    /// # Errors
    ///
    /// [`TaskError::TaskNotFound`] or [`TaskError::Checklist`] if the
    /// task or subtask cannot be found (no state change), or
    /// [`TaskError::Store`] if the remote write fails (after rollback).
    pub async fn toggle_subtask(
        &self,
        id: &TaskId,
        subtask: &SubtaskId,
        completed: bool,
    ) -> Result<(), TaskError> {
        let now = Utc::now();
        let (snapshot, guard, encoded, percentage) = {
            let mut entries = self.entries.lock().await;
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| TaskError::TaskNotFound(id.clone()))?;

            let mut checklist = Checklist::decode(entry.task.description.as_deref());
            checklist.set_completed(subtask, completed)?;
            let percentage = checklist.completion_percentage();
            let encoded = checklist.encode();

            let snapshot = SubtaskSnapshot {
                description: entry.task.description.clone(),
                completion_percentage: entry.task.completion_percentage,
                updated_at: entry.task.updated_at,
            };
            entry.task.description = Some(encoded.clone());
            entry.task.completion_percentage = percentage;
            entry.task.updated_at = now;
            entry.revision = next_revision();
            (snapshot, entry.revision, encoded, percentage)
        };

        let patch = TaskPatch {
            description: Some(Some(encoded)),
            completion_percentage: Some(percentage),
            updated_at: Some(now),
            ..TaskPatch::default()
        };
        match self.store.update_task(id, patch).await {
            Ok(_) => {
                if let Err(err) = self.refresh().await {
                    tracing::debug!(error = %err, "post-mutation refresh failed");
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    task = %id,
                    subtask = %subtask,
                    error = %err,
                    "subtask toggle failed, rolling back"
                );
                let mut entries = self.entries.lock().await;
                match entries.get_mut(id) {
                    Some(entry) if entry.revision == guard => {
                        entry.task.description = snapshot.description;
                        entry.task.completion_percentage = snapshot.completion_percentage;
                        entry.task.updated_at = snapshot.updated_at;
                        entry.revision = next_revision();
                    }
                    Some(_) => {
                        tracing::debug!(task = %id, "stale rollback skipped");
                    }
                    None => {}
                }
                Err(err.into())
            }
        }
    }

    /// Creates a task from the creation form's draft.
    ///
    /// The name is validated before any remote call; draft entries are
    /// grouped into checklist sections. Not optimistic: the store assigns
    /// the id, so the record lands in the map only once the insert
    /// succeeds.
    ///
    /// # Errors
    ///
    /// [`TaskError::Validation`] for an empty or oversized name (no
    /// remote call), or [`TaskError::Store`] if the insert fails.
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task, TaskError> {
        let title = validate_title(&draft.name)?.to_string();
        let description = if draft.entries.is_empty() {
            None
        } else {
            Some(Checklist::from_draft(&draft.entries).encode())
        };

        let created = self
            .store
            .insert_task(NewTask {
                title,
                description,
                priority: draft.priority,
                category: draft.category,
                due_date: draft.due_date,
            })
            .await?;
        tracing::info!(task = %created.id, "task created");

        self.entries
            .lock()
            .await
            .insert(created.id.clone(), TaskEntry::new(created.clone()));
        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "post-create refresh failed");
        }
        Ok(created)
    }

    /// Applies an arbitrary edit to a task. Not optimistic: the remote
    /// write happens first and the local map follows.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the remote write fails; local
    /// state is unchanged.
    pub async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        let updated = self.store.update_task(id, patch).await?;
        self.entries
            .lock()
            .await
            .insert(updated.id.clone(), TaskEntry::new(updated.clone()));
        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "post-update refresh failed");
        }
        Ok(updated)
    }

    /// Deletes the selected tasks in one batch. Not optimistic: local
    /// entries are removed only after the store confirms.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the batch delete fails; the local
    /// map is unchanged and no task disappears from the UI.
    pub async fn delete_selected(&self, ids: &[TaskId]) -> Result<(), TaskError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.store.delete_tasks(ids).await?;
        tracing::info!(count = ids.len(), "tasks deleted");
        let mut entries = self.entries.lock().await;
        for id in ids {
            entries.remove(id);
        }
        drop(entries);
        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "post-delete refresh failed");
        }
        Ok(())
    }
}
