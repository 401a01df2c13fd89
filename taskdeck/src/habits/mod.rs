//! Habit application layer.
//!
//! Habits are low-churn records, so [`HabitController`] skips the
//! optimistic pipeline: every write goes to the store first and the
//! local list follows via a reload.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use tokio::sync::Mutex;

use taskdeck_model::habit::{Habit, HabitId, HabitPatch, NewHabit, RecurrencePattern};
use taskdeck_model::task::{Priority, ValidationError, validate_title};

use crate::store::{RemoteStore, StoreError};

/// Errors that can occur during habit controller operations.
#[derive(Debug, thiserror::Error)]
pub enum HabitError {
    /// Input validation failed; no remote call was made.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Input of the habit-creation form.
#[derive(Debug, Clone)]
pub struct NewHabitDraft {
    /// Raw habit name; trimmed and validated before any remote call.
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Priority,
    pub reminder_time: NaiveTime,
    pub recurrence: RecurrencePattern,
    pub start_date: NaiveDate,
}

/// Owns the in-memory habit list with non-optimistic store-first writes.
pub struct HabitController<S: RemoteStore> {
    store: S,
    habits: Mutex<HashMap<HabitId, Habit>>,
}

impl<S: RemoteStore> HabitController<S> {
    /// Creates a controller over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            habits: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Replaces the local list with a full reload from the store.
    ///
    /// # Errors
    ///
    /// Returns [`HabitError::Store`] if the list call fails; the local
    /// list is left untouched.
    pub async fn refresh(&self) -> Result<(), HabitError> {
        let fetched = self.store.list_habits().await?;
        let mut habits = self.habits.lock().await;
        habits.clear();
        for habit in fetched {
            habits.insert(habit.id.clone(), habit);
        }
        Ok(())
    }

    /// Returns all habits, newest first.
    pub async fn snapshot(&self) -> Vec<Habit> {
        let habits = self.habits.lock().await;
        let mut list: Vec<Habit> = habits.values().cloned().collect();
        drop(habits);
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// Creates a habit from the creation form.
    ///
    /// # Errors
    ///
    /// [`HabitError::Validation`] for an empty or oversized name (no
    /// remote call), or [`HabitError::Store`] if the insert fails.
    pub async fn create(&self, draft: NewHabitDraft) -> Result<Habit, HabitError> {
        let title = validate_title(&draft.name)?.to_string();
        let created = self
            .store
            .insert_habit(NewHabit {
                title,
                description: draft.description,
                category: draft.category,
                priority: draft.priority,
                reminder_time: draft.reminder_time,
                recurrence: draft.recurrence,
                start_date: draft.start_date,
            })
            .await?;
        tracing::info!(habit = %created.id, "habit created");
        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "post-create refresh failed");
        }
        Ok(created)
    }

    /// Pauses or resumes a habit.
    ///
    /// # Errors
    ///
    /// Returns [`HabitError::Store`] if the update fails; the local list
    /// is unchanged.
    pub async fn set_active(&self, id: &HabitId, active: bool) -> Result<(), HabitError> {
        self.store
            .update_habit(id, HabitPatch::set_active(active))
            .await?;
        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "post-update refresh failed");
        }
        Ok(())
    }

    /// Applies an arbitrary edit to a habit.
    ///
    /// # Errors
    ///
    /// Returns [`HabitError::Store`] if the update fails.
    pub async fn update(&self, id: &HabitId, patch: HabitPatch) -> Result<Habit, HabitError> {
        let updated = self.store.update_habit(id, patch).await?;
        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "post-update refresh failed");
        }
        Ok(updated)
    }

    /// Deletes one habit.
    ///
    /// # Errors
    ///
    /// Returns [`HabitError::Store`] if the delete fails; the habit
    /// stays in the local list.
    pub async fn delete(&self, id: &HabitId) -> Result<(), HabitError> {
        self.store.delete_habit(id).await?;
        tracing::info!(habit = %id, "habit deleted");
        self.habits.lock().await.remove(id);
        if let Err(err) = self.refresh().await {
            tracing::debug!(error = %err, "post-delete refresh failed");
        }
        Ok(())
    }
}
