//! # Focuslane Core Library
//!
//! Core logic for the Focuslane focus timer. Everything is available through
//! the standalone `focuslane` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a wall-clock state machine for the focus/break cycle.
//!   Remaining time is derived from absolute timestamps, so host suspension
//!   never causes drift. The caller drives it with `tick()`/`on_resume()`.
//! - **Task Tree**: hierarchical tasks with derived completion, reparenting
//!   and a user-adjustable display order.
//! - **Session Log**: append-only history of completed focus phases.
//! - **Storage**: SQLite key/value blobs and TOML configuration.
//!
//! ## Key Components
//!
//! - [`FocusEngine`]: timer state machine
//! - [`TaskTree`]: task store, also the engine's [`TaskLedger`]
//! - [`SessionLog`]: completed sessions and aggregates
//! - [`Workspace`]: store, tree and engine with one load/save boundary
//! - [`Database`]: persistence
//! - [`Config`]: application configuration

pub mod clock;
pub mod error;
pub mod events;
pub mod notify;
pub mod session;
pub mod storage;
pub mod task;
pub mod timer;
pub mod workspace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use notify::{LogNotifier, NoopNotifier, Notification, Notifier, NotifyError, NotifyKind};
pub use session::{LabelCounts, SessionLog, SessionRecord, SessionSummary};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use task::{MoveError, MovePosition, Task, TaskTree};
pub use timer::{
    BreakKind, FocusEngine, Phase, TaskLabel, TaskLedger, TaskRef, TimerSettings, TimerState,
};
pub use workspace::Workspace;
