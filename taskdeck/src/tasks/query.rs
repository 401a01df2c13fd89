//! Snapshot filtering and ordering for task list views.

use taskdeck_model::task::{Task, TaskOrder, TaskStatus};

/// A read query over the controller's task snapshot.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Case-insensitive text to match against title and description.
    pub search: Option<String>,
    /// Whether completed tasks are included; the main list hides them.
    pub include_completed: bool,
    /// Ordering of the result.
    pub order: TaskOrder,
}

impl TaskQuery {
    /// Whether a task passes this query's filters.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if !self.include_completed && task.status == TaskStatus::Completed {
            return false;
        }
        let Some(search) = &self.search else {
            return true;
        };
        let needle = search.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        task.title.to_lowercase().contains(&needle)
            || task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    /// Filters and sorts a snapshot in place.
    pub fn apply(&self, tasks: &mut Vec<Task>) {
        tasks.retain(|t| self.matches(t));
        self.order.sort(tasks);
    }
}
