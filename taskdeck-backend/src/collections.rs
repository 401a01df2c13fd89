//! Owner-scoped record collections.
//!
//! Two in-memory collections, `tasks` and `habits`, keyed by record id.
//! Every read and write is scoped to the owning user: a record belonging
//! to another owner is indistinguishable from a missing one.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use taskdeck_model::checklist::Checklist;
use taskdeck_model::habit::{Habit, HabitId, HabitPatch, NewHabit};
use taskdeck_model::task::{
    NewTask, Task, TaskId, TaskOrder, TaskPatch, TaskStatus, UserId, ValidationError,
    validate_title,
};

/// In-memory task and habit collections.
#[derive(Debug, Default)]
pub struct Collections {
    tasks: RwLock<HashMap<TaskId, Task>>,
    habits: RwLock<HashMap<HabitId, Habit>>,
}

impl Collections {
    /// Creates empty collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a task for `owner`, assigning id and timestamps.
    ///
    /// The cached completion percentage is recomputed from the submitted
    /// description so a client cannot store an inconsistent pair.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the title is empty or too long.
    pub async fn insert_task(&self, owner: &UserId, new: NewTask) -> Result<Task, ValidationError> {
        validate_title(&new.title)?;
        let now = Utc::now();
        let stored = Task {
            id: TaskId::new(),
            owner: owner.clone(),
            title: new.title,
            completion_percentage: Checklist::decode(new.description.as_deref())
                .completion_percentage(),
            description: new.description,
            status: TaskStatus::Active,
            priority: new.priority,
            category: new.category,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        let mut tasks = self.tasks.write().await;
        tasks.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    /// Lists `owner`'s tasks in the given order.
    pub async fn list_tasks(&self, owner: &UserId, order: TaskOrder) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut out: Vec<Task> = tasks.values().filter(|t| &t.owner == owner).cloned().collect();
        order.sort(&mut out);
        out
    }

    /// Applies a patch to `owner`'s task, stamping `updated_at`.
    ///
    /// Returns `None` when the task does not exist or belongs to someone
    /// else.
    pub async fn update_task(
        &self,
        owner: &UserId,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Option<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(id).filter(|t| &t.owner == owner)?;
        patch.apply(task);
        task.updated_at = Utc::now();
        Some(task.clone())
    }

    /// Deletes each of `owner`'s tasks named in `ids`. Missing ids and
    /// other owners' records are skipped.
    pub async fn delete_tasks(&self, owner: &UserId, ids: &[TaskId]) {
        let mut tasks = self.tasks.write().await;
        for id in ids {
            if tasks.get(id).is_some_and(|t| &t.owner == owner) {
                tasks.remove(id);
            }
        }
    }

    /// Inserts a habit for `owner`, assigning id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the title is empty or too long.
    pub async fn insert_habit(
        &self,
        owner: &UserId,
        new: NewHabit,
    ) -> Result<Habit, ValidationError> {
        validate_title(&new.title)?;
        let now = Utc::now();
        let stored = Habit {
            id: HabitId::new(),
            owner: owner.clone(),
            title: new.title,
            description: new.description,
            category: new.category,
            priority: new.priority,
            reminder_time: new.reminder_time,
            recurrence: new.recurrence,
            start_date: new.start_date,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let mut habits = self.habits.write().await;
        habits.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    /// Lists `owner`'s habits.
    pub async fn list_habits(&self, owner: &UserId) -> Vec<Habit> {
        let habits = self.habits.read().await;
        habits.values().filter(|h| &h.owner == owner).cloned().collect()
    }

    /// Applies a patch to `owner`'s habit, stamping `updated_at`.
    pub async fn update_habit(
        &self,
        owner: &UserId,
        id: &HabitId,
        patch: &HabitPatch,
    ) -> Option<Habit> {
        let mut habits = self.habits.write().await;
        let habit = habits.get_mut(id).filter(|h| &h.owner == owner)?;
        patch.apply(habit);
        habit.updated_at = Utc::now();
        Some(habit.clone())
    }

    /// Deletes `owner`'s habit, returning whether it existed.
    pub async fn delete_habit(&self, owner: &UserId, id: &HabitId) -> bool {
        let mut habits = self.habits.write().await;
        if habits.get(id).is_some_and(|h| &h.owner == owner) {
            habits.remove(id);
            true
        } else {
            false
        }
    }
}
