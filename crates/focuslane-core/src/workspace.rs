//! Store, task tree and engine wired together.
//!
//! [`Workspace`] is the explicit persistence boundary: `open`/`reload` read
//! every blob best-effort, `save` writes them all back. A corrupt blob only
//! resets its own part of the state.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::notify::Notifier;
use crate::session::{SessionLog, SessionRecord};
use crate::storage::{keys, load_or_default, save_json, KvStore};
use crate::task::{Task, TaskTree};
use crate::timer::{FocusEngine, RuntimeState, TimerSettings};

pub struct Workspace<S: KvStore> {
    store: S,
    clock: Arc<dyn Clock>,
    retention: usize,
    tasks: TaskTree,
    engine: FocusEngine,
}

impl<S: KvStore> std::fmt::Debug for Workspace<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("tasks", &self.tasks)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

struct Loaded {
    tasks: TaskTree,
    settings: TimerSettings,
    sessions: SessionLog,
    runtime: Option<RuntimeState>,
}

fn load_all<S: KvStore>(store: &S, clock: &Arc<dyn Clock>, retention: usize) -> Loaded {
    let roots: Vec<Task> = load_or_default(store, keys::TASKS);
    let order: Vec<String> = load_or_default(store, keys::DISPLAY_ORDER);
    let pin: Option<String> = load_or_default(store, keys::FOCUS_PIN);
    let tasks = TaskTree::from_parts(roots, order, pin, Arc::clone(clock));

    let mut settings: TimerSettings = load_or_default(store, keys::SETTINGS);
    if let Err(e) = settings.validate() {
        tracing::warn!(error = %e, "stored settings out of range, using defaults");
        settings = TimerSettings::default();
    }

    let records: Vec<SessionRecord> = load_or_default(store, keys::SESSIONS);
    let sessions = SessionLog::from_records(records, retention);
    let runtime: Option<RuntimeState> = load_or_default(store, keys::TIMER_STATE);

    Loaded {
        tasks,
        settings,
        sessions,
        runtime,
    }
}

impl<S: KvStore> Workspace<S> {
    /// Load everything from `store`. Never fails; broken blobs fall back to
    /// defaults.
    pub fn open(
        store: S,
        clock: Arc<dyn Clock>,
        notifier: Box<dyn Notifier>,
        retention: usize,
    ) -> Self {
        let loaded = load_all(&store, &clock, retention);
        let mut engine = FocusEngine::new(
            loaded.settings,
            loaded.sessions,
            Arc::clone(&clock),
            notifier,
        );
        if let Some(state) = loaded.runtime {
            engine.restore(state);
        }
        tracing::debug!(tasks = loaded.tasks.len(), "workspace opened");
        Self {
            store,
            clock,
            retention,
            tasks: loaded.tasks,
            engine,
        }
    }

    /// Discard in-memory state and read it back from the store.
    pub fn reload(&mut self) {
        let loaded = load_all(&self.store, &self.clock, self.retention);
        self.tasks = loaded.tasks;
        self.engine
            .reload(loaded.settings, loaded.sessions, loaded.runtime);
    }

    /// Write every blob.
    ///
    /// # Errors
    /// Returns the first failed write; earlier writes stay applied.
    pub fn save(&mut self) -> Result<()> {
        save_json(&mut self.store, keys::TASKS, self.tasks.tasks())?;
        save_json(&mut self.store, keys::DISPLAY_ORDER, self.tasks.display_order())?;
        save_json(&mut self.store, keys::FOCUS_PIN, &self.tasks.focus_pin())?;
        save_json(&mut self.store, keys::SETTINGS, self.engine.settings())?;
        save_json(&mut self.store, keys::SESSIONS, self.engine.sessions().records())?;
        save_json(&mut self.store, keys::TIMER_STATE, self.engine.runtime())?;
        tracing::info!("workspace saved");
        Ok(())
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn tasks(&self) -> &TaskTree {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskTree {
        &mut self.tasks
    }

    pub fn engine(&self) -> &FocusEngine {
        &self.engine
    }

    /// Title of the task the timer is on, resolved now.
    pub fn current_task(&self) -> String {
        self.engine.current_task(&self.tasks)
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot()
    }

    // ── Timer verbs ──────────────────────────────────────────────────

    pub fn tick(&mut self) -> Vec<Event> {
        self.engine.tick(&mut self.tasks)
    }

    pub fn resume(&mut self) -> Vec<Event> {
        self.engine.on_resume(&mut self.tasks)
    }

    pub fn start(&mut self) -> Option<Event> {
        self.engine.start(&self.tasks)
    }

    pub fn pause(&mut self) -> Vec<Event> {
        self.engine.pause(&mut self.tasks)
    }

    pub fn reset(&mut self) -> Event {
        self.engine.reset()
    }

    pub fn extend_current_task(&mut self) -> Option<Event> {
        self.engine.extend_current_task()
    }

    pub fn confirm_break(&mut self) -> Option<Event> {
        self.engine.confirm_break()
    }

    pub fn skip_break(&mut self) -> Vec<Event> {
        self.engine.skip_break(&self.tasks)
    }

    /// Validate, apply and persist new settings.
    ///
    /// # Errors
    /// Returns a validation error (nothing changes) or a storage error (the
    /// settings are applied in memory but not persisted).
    pub fn update_settings(&mut self, settings: TimerSettings) -> Result<Event> {
        let event = self.engine.update_settings(settings)?;
        save_json(&mut self.store, keys::SETTINGS, self.engine.settings())?;
        Ok(event)
    }

    /// Set one setting by key, e.g. `work_min` = `"50"`.
    ///
    /// # Errors
    /// Returns an error for unknown keys, bad values, or a failed write.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<Event> {
        let updated = self.engine.settings().with_value(key, value)?;
        self.update_settings(updated)
    }
}
