use serde::{Deserialize, Serialize};

/// A task as seen by the timer: an optional stable id plus its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
}

/// The only view the timer has of the task store.
///
/// `active_tasks` is read whenever the timer needs a task name; nothing is
/// cached between calls. Minutes are credited through `add_time_to_task*`.
pub trait TaskLedger {
    /// Focused task first, then the next candidates, at most `limit`.
    fn active_tasks(&self, limit: usize) -> Vec<TaskRef>;

    /// Credit the first task whose title matches exactly.
    fn add_time_to_task(&mut self, title: &str, minutes: u32) -> bool;

    /// Credit a task by id. Ledgers without ids keep the default.
    fn add_time_to_task_by_id(&mut self, _id: &str, _minutes: u32) -> bool {
        false
    }
}
