//! In-process store implementing the [`RemoteStore`] trait.
//!
//! Backs unit and integration tests, and the offline demo mode. Behaves
//! like the real backend (server-assigned ids and timestamps, owner
//! scoping, percentage normalization) and additionally supports scripted
//! fault injection and per-operation call counting so tests can observe
//! exactly which remote calls a controller makes.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;

use taskdeck_model::checklist::Checklist;
use taskdeck_model::habit::{Habit, HabitId, HabitPatch, NewHabit};
use taskdeck_model::task::{NewTask, Task, TaskId, TaskOrder, TaskPatch, TaskStatus, UserId};

use super::{RemoteStore, Session, StoreError};

#[derive(Default)]
struct State {
    tasks: HashMap<TaskId, Task>,
    habits: HashMap<HabitId, Habit>,
    fail_list: VecDeque<StoreError>,
    fail_insert: VecDeque<StoreError>,
    fail_update: VecDeque<StoreError>,
    fail_delete: VecDeque<StoreError>,
}

/// Per-operation call counters, observable from tests.
#[derive(Debug, Default)]
pub struct CallCounters {
    list: AtomicU32,
    insert: AtomicU32,
    update: AtomicU32,
    delete: AtomicU32,
}

/// In-memory store with scripted fault injection.
pub struct MemoryStore {
    session: Option<Session>,
    state: Mutex<State>,
    counters: CallCounters,
}

impl MemoryStore {
    /// Creates a store with an authenticated session for the given user.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            session: Some(Session {
                user: UserId::new(user),
            }),
            state: Mutex::new(State::default()),
            counters: CallCounters::default(),
        }
    }

    /// Creates a store with no session. Every operation fails with
    /// [`StoreError::Unauthenticated`].
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            session: None,
            state: Mutex::new(State::default()),
            counters: CallCounters::default(),
        }
    }

    /// Queues an error for the next `list_tasks`/`list_habits` call.
    pub async fn fail_next_list(&self, err: StoreError) {
        self.state.lock().await.fail_list.push_back(err);
    }

    /// Queues an error for the next `insert_task`/`insert_habit` call.
    pub async fn fail_next_insert(&self, err: StoreError) {
        self.state.lock().await.fail_insert.push_back(err);
    }

    /// Queues an error for the next `update_task`/`update_habit` call.
    pub async fn fail_next_update(&self, err: StoreError) {
        self.state.lock().await.fail_update.push_back(err);
    }

    /// Queues an error for the next `delete_tasks`/`delete_habit` call.
    pub async fn fail_next_delete(&self, err: StoreError) {
        self.state.lock().await.fail_delete.push_back(err);
    }

    /// Number of list calls made so far.
    pub fn list_calls(&self) -> u32 {
        self.counters.list.load(Ordering::Relaxed)
    }

    /// Number of insert calls made so far.
    pub fn insert_calls(&self) -> u32 {
        self.counters.insert.load(Ordering::Relaxed)
    }

    /// Number of update calls made so far.
    pub fn update_calls(&self) -> u32 {
        self.counters.update.load(Ordering::Relaxed)
    }

    /// Number of delete calls made so far.
    pub fn delete_calls(&self) -> u32 {
        self.counters.delete.load(Ordering::Relaxed)
    }

    /// Returns the stored record directly, bypassing the trait surface.
    pub async fn stored_task(&self, id: &TaskId) -> Option<Task> {
        self.state.lock().await.tasks.get(id).cloned()
    }

    fn session_user(&self) -> Result<UserId, StoreError> {
        self.session
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or(StoreError::Unauthenticated)
    }
}

impl RemoteStore for MemoryStore {
    fn current_session(&self) -> Option<Session> {
        self.session.clone()
    }

    async fn list_tasks(&self, order: TaskOrder) -> Result<Vec<Task>, StoreError> {
        self.counters.list.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user()?;
        let mut state = self.state.lock().await;
        if let Some(err) = state.fail_list.pop_front() {
            return Err(err);
        }
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.owner == user)
            .cloned()
            .collect();
        order.sort(&mut tasks);
        Ok(tasks)
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.counters.insert.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user()?;
        let mut state = self.state.lock().await;
        if let Some(err) = state.fail_insert.pop_front() {
            return Err(err);
        }
        let now = Utc::now();
        let stored = Task {
            id: TaskId::new(),
            owner: user,
            title: task.title,
            completion_percentage: Checklist::decode(task.description.as_deref())
                .completion_percentage(),
            description: task.description,
            status: TaskStatus::Active,
            priority: task.priority,
            category: task.category,
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        state.tasks.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        self.counters.update.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user()?;
        let mut state = self.state.lock().await;
        if let Some(err) = state.fail_update.pop_front() {
            return Err(err);
        }
        let task = state
            .tasks
            .get_mut(id)
            .filter(|t| t.owner == user)
            .ok_or_else(|| StoreError::NotFound("task".to_string()))?;
        patch.apply(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<(), StoreError> {
        self.counters.delete.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user()?;
        let mut state = self.state.lock().await;
        if let Some(err) = state.fail_delete.pop_front() {
            return Err(err);
        }
        // Missing ids are not an error, matching the backend's batch
        // delete semantics.
        for id in ids {
            if state.tasks.get(id).is_some_and(|t| t.owner == user) {
                state.tasks.remove(id);
            }
        }
        Ok(())
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, StoreError> {
        self.counters.list.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user()?;
        let mut state = self.state.lock().await;
        if let Some(err) = state.fail_list.pop_front() {
            return Err(err);
        }
        let mut habits: Vec<Habit> = state
            .habits
            .values()
            .filter(|h| h.owner == user)
            .cloned()
            .collect();
        habits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(habits)
    }

    async fn insert_habit(&self, habit: NewHabit) -> Result<Habit, StoreError> {
        self.counters.insert.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user()?;
        let mut state = self.state.lock().await;
        if let Some(err) = state.fail_insert.pop_front() {
            return Err(err);
        }
        let now = Utc::now();
        let stored = Habit {
            id: HabitId::new(),
            owner: user,
            title: habit.title,
            description: habit.description,
            category: habit.category,
            priority: habit.priority,
            reminder_time: habit.reminder_time,
            recurrence: habit.recurrence,
            start_date: habit.start_date,
            active: true,
            created_at: now,
            updated_at: now,
        };
        state.habits.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_habit(&self, id: &HabitId, patch: HabitPatch) -> Result<Habit, StoreError> {
        self.counters.update.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user()?;
        let mut state = self.state.lock().await;
        if let Some(err) = state.fail_update.pop_front() {
            return Err(err);
        }
        let habit = state
            .habits
            .get_mut(id)
            .filter(|h| h.owner == user)
            .ok_or_else(|| StoreError::NotFound("habit".to_string()))?;
        patch.apply(habit);
        habit.updated_at = Utc::now();
        Ok(habit.clone())
    }

    async fn delete_habit(&self, id: &HabitId) -> Result<(), StoreError> {
        self.counters.delete.fetch_add(1, Ordering::Relaxed);
        let user = self.session_user()?;
        let mut state = self.state.lock().await;
        if let Some(err) = state.fail_delete.pop_front() {
            return Err(err);
        }
        if state.habits.get(id).is_some_and(|h| h.owner == user) {
            state.habits.remove(id);
            Ok(())
        } else {
            Err(StoreError::NotFound("habit".to_string()))
        }
    }
}
