//! Task management commands for CLI.

use clap::Subcommand;
use focuslane_core::{Config, MovePosition, Task, TaskTree};

use super::{open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Create as the last child of this task
        #[arg(long)]
        parent: Option<String>,
    },
    /// List tasks as an indented tree
    List {
        /// Print the nested task JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Flip completion of a leaf task
    Toggle {
        /// Task ID
        id: String,
    },
    /// Rename a task
    Edit {
        /// Task ID
        id: String,
        /// New title
        title: String,
    },
    /// Delete a task and its subtasks
    Delete {
        /// Task ID
        id: String,
    },
    /// Move a task relative to another one
    Move {
        /// Task ID
        id: String,
        /// Target task ID
        target: String,
        /// before, after or inside
        #[arg(long, default_value = "inside")]
        position: MovePosition,
    },
    /// Reorder incomplete tasks among their siblings
    Reorder {
        /// Current index among incomplete siblings
        from: usize,
        /// New index
        to: usize,
        /// Reorder children of this task instead of top-level tasks
        #[arg(long)]
        parent: Option<String>,
    },
    /// Tasks the timer would work on next
    Active {
        #[arg(long, default_value = "2")]
        limit: usize,
    },
    /// The next task to focus on
    Next,
    /// Pin a task as the focus
    Focus {
        /// Task ID
        id: String,
    },
    /// Drop the focus pin
    Unfocus,
}

fn render(tree: &TaskTree) -> String {
    let mut out = String::new();
    for row in tree.flatten() {
        let mark = if row.task.completed { "x" } else { " " };
        let indent = "  ".repeat(row.depth as usize);
        let pin = if tree.focus_pin() == Some(row.task.id.as_str()) {
            " *"
        } else {
            ""
        };
        out.push_str(&format!(
            "{indent}[{mark}] {}{pin}  ({}, {} min)\n",
            row.task.title, row.task.id, row.task.total_time
        ));
    }
    out
}

fn not_found(id: &str) -> Box<dyn std::error::Error> {
    format!("Task not found: {id}").into()
}

pub fn run(action: TaskAction, config: &Config) -> CmdResult {
    let super::Session { mut ws, .. } = open(config)?;

    match action {
        TaskAction::Add { title, parent } => {
            let tasks = ws.tasks_mut();
            let id = match parent.as_deref() {
                Some(parent_id) => tasks
                    .add_child_task(parent_id, &title)
                    .ok_or_else(|| format!("cannot add '{title}' under {parent_id}"))?,
                None => tasks
                    .add_root_task(&title)
                    .ok_or("task title must not be empty")?,
            };
            tracing::info!(%id, "task created");
            if let Some(task) = ws.tasks().get(&id) {
                print_json(task)?;
            }
        }
        TaskAction::List { json } => {
            if json {
                print_json(ws.tasks().tasks())?;
            } else if ws.tasks().is_empty() {
                println!("No tasks.");
            } else {
                print!("{}", render(ws.tasks()));
            }
        }
        TaskAction::Toggle { id } => {
            if !ws.tasks_mut().toggle_task(&id) {
                return Err(format!("cannot toggle {id}: unknown task or it has subtasks").into());
            }
            let task = ws.tasks().get(&id).ok_or_else(|| not_found(&id))?;
            println!("Task {}: {id}", if task.completed { "completed" } else { "reopened" });
        }
        TaskAction::Edit { id, title } => {
            if !ws.tasks_mut().edit_task(&id, &title) {
                return Err(format!("cannot rename {id}: unknown task or empty title").into());
            }
            println!("Task updated: {id}");
        }
        TaskAction::Delete { id } => {
            if !ws.tasks_mut().delete_task(&id) {
                return Err(not_found(&id));
            }
            println!("Task deleted: {id}");
        }
        TaskAction::Move {
            id,
            target,
            position,
        } => {
            ws.tasks_mut().move_task(&id, &target, position)?;
            println!("Task moved: {id}");
        }
        TaskAction::Reorder { from, to, parent } => {
            let moved = match parent.as_deref() {
                Some(parent_id) => ws.tasks_mut().reorder_children(parent_id, from, to),
                None => ws.tasks_mut().reorder_siblings(from, to),
            };
            if !moved {
                return Err(format!("cannot move position {from} to {to}").into());
            }
            println!("Order updated");
        }
        TaskAction::Active { limit } => {
            let active: Vec<&Task> = ws.tasks().active_tasks(limit);
            print_json(&active)?;
        }
        TaskAction::Next => match ws.tasks().next_focus_task() {
            Some(task) => print_json(task)?,
            None => println!("null"),
        },
        TaskAction::Focus { id } => {
            if !ws.tasks_mut().pin_focus(&id) {
                return Err(format!("cannot focus {id}: unknown or completed task").into());
            }
            println!("Focus pinned: {id}");
        }
        TaskAction::Unfocus => {
            ws.tasks_mut().clear_focus();
            println!("Focus cleared");
        }
    }

    ws.save()?;
    Ok(())
}
