//! Hierarchical tasks.
//!
//! A [`Task`] exclusively owns its children. Completion of a leaf is set by
//! the user; completion of a task with children is derived from them and
//! kept in sync by [`TaskTree`] after every mutation.

mod tree;

pub use tree::{TaskRow, TaskTree};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A node in the task tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Trimmed, non-empty title
    pub title: String,
    /// Authoritative for leaves, derived for parents
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Focus minutes credited to this task
    #[serde(default)]
    pub total_time: u32,
    #[serde(default)]
    pub children: Vec<Task>,
    /// Lookup-only back reference; `None` for roots
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Depth from the root, recomputed on every structural change
    #[serde(default)]
    pub level: u32,
}

impl Task {
    pub(crate) fn new(id: String, title: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            completed: false,
            created_at: now,
            completed_at: None,
            total_time: 0,
            children: Vec::new(),
            parent_id: None,
            level: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Set completion, maintaining `completed_at` on transitions only.
    pub(crate) fn set_completed(&mut self, done: bool, now: DateTime<Utc>) {
        if self.completed == done {
            return;
        }
        self.completed = done;
        self.completed_at = if done { Some(now) } else { None };
    }

    /// Ids of this task and all descendants, depth-first.
    pub fn subtree_ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_ids(self, &mut out);
        out
    }

    /// Number of tasks in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Task::subtree_len).sum::<usize>()
    }
}

fn collect_ids(task: &Task, out: &mut Vec<String>) {
    out.push(task.id.clone());
    for child in &task.children {
        collect_ids(child, out);
    }
}

/// Where `move_task` puts a task relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePosition {
    /// Sibling of the target, just before it
    Before,
    /// Sibling of the target, just after it
    After,
    /// Last child of the target
    Inside,
}

impl std::str::FromStr for MovePosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(MovePosition::Before),
            "after" => Ok(MovePosition::After),
            "inside" => Ok(MovePosition::Inside),
            other => Err(format!("unknown position '{other}' (expected before, after or inside)")),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("A task cannot be moved relative to itself")]
    SelfTarget,

    #[error("Moving {id} next to or inside {target} would make it its own descendant")]
    Cycle { id: String, target: String },
}
