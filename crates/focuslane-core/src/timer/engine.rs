//! Focus/break phase engine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads. The caller calls `tick()` periodically and `on_resume()` when the
//! host wakes up; both simply observe the clock, so how often they run does
//! not affect the result.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> RunningWork --expire--> ConfirmationPending
//! ConfirmationPending --extend--> RunningWork (extension)
//! ConfirmationPending --confirm | timeout--> RunningBreak
//! RunningBreak --expire | skip--> RunningWork
//! Running* --pause--> Paused --start--> Running*
//! any --reset--> Idle
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::countdown::Countdown;
use super::ledger::{TaskLedger, TaskRef};
use super::settings::{BreakKind, TimerSettings};
use crate::clock::Clock;
use crate::error::ValidationError;
use crate::events::Event;
use crate::notify::{Notification, Notifier, NotifyKind};
use crate::session::{SessionLog, SessionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    RunningWork,
    RunningBreak(BreakKind),
    /// Work ran out; waiting for extend or break, auto-resolving to break.
    ConfirmationPending,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    Break(BreakKind),
}

impl Phase {
    pub fn is_break(self) -> bool {
        matches!(self, Phase::Break(_))
    }
}

/// Active task slot in dual-task mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskLabel {
    #[default]
    A,
    B,
}

impl TaskLabel {
    pub fn flipped(self) -> Self {
        match self {
            TaskLabel::A => TaskLabel::B,
            TaskLabel::B => TaskLabel::A,
        }
    }
}

impl fmt::Display for TaskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskLabel::A => f.write_str("A"),
            TaskLabel::B => f.write_str("B"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct OpenSession {
    started_at: DateTime<Utc>,
    /// Focus task captured when the session opened.
    #[serde(default)]
    task: Option<TaskRef>,
}

/// Everything a later process needs to continue where this one stopped.
///
/// Countdowns hold absolute timestamps, so time spent with no process
/// running is accounted for on the first observation after restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeState {
    state: TimerState,
    phase: Phase,
    countdown: Countdown,
    round: u32,
    label: TaskLabel,
    #[serde(default)]
    since_switch: u32,
    #[serde(default)]
    session: Option<OpenSession>,
    #[serde(default)]
    confirmation: Option<Countdown>,
    #[serde(default)]
    extending: bool,
    /// Task of the last completed session; an extension continues it.
    #[serde(default)]
    last_task: Option<TaskRef>,
}

impl RuntimeState {
    /// Idle at the start of round 1, label A.
    pub fn fresh(settings: &TimerSettings) -> Self {
        Self {
            state: TimerState::Idle,
            phase: Phase::Work,
            countdown: Countdown::new(settings.work_secs()),
            round: 1,
            label: TaskLabel::A,
            since_switch: 0,
            session: None,
            confirmation: None,
            extending: false,
            last_task: None,
        }
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::fresh(&TimerSettings::default())
    }
}

/// Core focus timer.
pub struct FocusEngine {
    settings: TimerSettings,
    rt: RuntimeState,
    sessions: SessionLog,
    clock: Arc<dyn Clock>,
    notifier: Box<dyn Notifier>,
}

impl fmt::Debug for FocusEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusEngine")
            .field("settings", &self.settings)
            .field("runtime", &self.rt)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl FocusEngine {
    pub fn new(
        settings: TimerSettings,
        sessions: SessionLog,
        clock: Arc<dyn Clock>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let rt = RuntimeState::fresh(&settings);
        Self {
            settings,
            rt,
            sessions,
            clock,
            notifier,
        }
    }

    /// Continue from a persisted runtime state.
    pub fn restore(&mut self, state: RuntimeState) {
        self.rt = state;
        if self.rt.round == 0 {
            self.rt.round = 1;
        }
    }

    /// Swap in freshly loaded data, keeping the clock and notifier.
    pub fn reload(
        &mut self,
        settings: TimerSettings,
        sessions: SessionLog,
        state: Option<RuntimeState>,
    ) {
        self.rt = RuntimeState::fresh(&settings);
        self.settings = settings;
        self.sessions = sessions;
        if let Some(state) = state {
            self.restore(state);
        }
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.rt
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn state(&self) -> TimerState {
        self.rt.state
    }

    pub fn phase(&self) -> Phase {
        self.rt.phase
    }

    /// Always `A` in single-task mode.
    pub fn current_label(&self) -> TaskLabel {
        if self.settings.dual_task_mode {
            self.rt.label
        } else {
            TaskLabel::A
        }
    }

    pub fn current_round(&self) -> u32 {
        self.rt.round
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.rt.state,
            TimerState::RunningWork | TimerState::RunningBreak(_)
        )
    }

    pub fn is_break(&self) -> bool {
        self.rt.phase.is_break()
    }

    /// Remaining seconds of the current phase as of now.
    pub fn time_left_secs(&self) -> u64 {
        self.rt.countdown.remaining_at(self.clock.now())
    }

    pub fn total_secs(&self) -> u64 {
        self.rt.countdown.total_secs()
    }

    pub fn confirmation_left_secs(&self) -> Option<u64> {
        if self.rt.state != TimerState::ConfirmationPending {
            return None;
        }
        let now = self.clock.now();
        Some(self.rt.confirmation.as_ref().map_or(0, |c| c.remaining_at(now)))
    }

    pub fn sessions(&self) -> &SessionLog {
        &self.sessions
    }

    /// Completed sessions on the current UTC day.
    pub fn today_count(&self) -> usize {
        self.sessions.count_on(self.clock.now().date_naive())
    }

    /// Title of the task being worked on, resolved from the ledger now.
    pub fn current_task(&self, ledger: &dyn TaskLedger) -> String {
        if self.rt.phase.is_break() {
            return "Break".to_string();
        }
        self.work_task(ledger)
            .map(|t| t.title)
            .unwrap_or_else(|| self.fallback_title().to_string())
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.rt.state,
            phase: self.rt.phase,
            label: self.current_label(),
            round: self.rt.round,
            remaining_secs: self.time_left_secs(),
            total_secs: self.total_secs(),
            confirmation_left_secs: self.confirmation_left_secs(),
            today_count: self.today_count(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Run the current phase from `Idle` or `Paused`.
    pub fn start(&mut self, ledger: &dyn TaskLedger) -> Option<Event> {
        match self.rt.state {
            TimerState::Idle | TimerState::Paused => {
                let now = self.clock.now();
                if self.rt.phase == Phase::Work && self.rt.session.is_none() {
                    self.open_session(now, ledger);
                }
                self.run_current_phase(now);
                tracing::debug!(phase = ?self.rt.phase, round = self.rt.round, "timer started");
                Some(Event::TimerStarted {
                    phase: self.rt.phase,
                    label: self.current_label(),
                    remaining_secs: self.rt.countdown.remaining_secs(),
                    at: now,
                })
            }
            _ => None,
        }
    }

    /// Freeze a running phase at the remaining time as of now. A phase that
    /// already ran out completes instead of pausing at zero.
    pub fn pause(&mut self, ledger: &mut dyn TaskLedger) -> Vec<Event> {
        let now = self.clock.now();
        let left = match self.rt.state {
            TimerState::RunningWork | TimerState::RunningBreak(_) => self.rt.countdown.observe(now),
            _ => return Vec::new(),
        };
        if left == 0 {
            return match self.rt.state {
                TimerState::RunningBreak(kind) => self.complete_break(now, kind, &*ledger),
                _ => self.complete_work(now, ledger),
            };
        }
        self.rt.countdown.freeze();
        self.rt.state = TimerState::Paused;
        tracing::debug!(remaining = left, "timer paused");
        vec![Event::TimerPaused {
            phase: self.rt.phase,
            remaining_secs: left,
            at: now,
        }]
    }

    /// Back to `Idle` with a full countdown for the current phase.
    /// Round and label stay; the open session is dropped.
    pub fn reset(&mut self) -> Event {
        self.rt.state = TimerState::Idle;
        self.rt.session = None;
        self.rt.confirmation = None;
        self.rt.extending = false;
        self.rt.countdown = Countdown::new(self.current_phase_secs());
        tracing::debug!(phase = ?self.rt.phase, "timer reset");
        Event::TimerReset {
            phase: self.rt.phase,
            total_secs: self.rt.countdown.total_secs(),
            at: self.clock.now(),
        }
    }

    /// Observe the clock. At most one phase completes per call.
    pub fn tick(&mut self, ledger: &mut dyn TaskLedger) -> Vec<Event> {
        let now = self.clock.now();
        match self.rt.state {
            TimerState::RunningWork => {
                if self.rt.countdown.observe(now) == 0 {
                    return self.complete_work(now, ledger);
                }
            }
            TimerState::RunningBreak(kind) => {
                if self.rt.countdown.observe(now) == 0 {
                    return self.complete_break(now, kind, &*ledger);
                }
            }
            TimerState::ConfirmationPending => {
                let expired = self
                    .rt
                    .confirmation
                    .as_mut()
                    .map_or(true, |c| c.observe(now) == 0);
                if expired {
                    tracing::debug!("confirmation timed out");
                    return vec![self.proceed_to_break(now)];
                }
            }
            TimerState::Idle | TimerState::Paused => {}
        }
        Vec::new()
    }

    /// The host came back from suspension.
    pub fn on_resume(&mut self, ledger: &mut dyn TaskLedger) -> Vec<Event> {
        tracing::debug!(state = ?self.rt.state, "resume observed");
        self.tick(ledger)
    }

    /// Keep working on the same task for `extension_min` more minutes.
    pub fn extend_current_task(&mut self) -> Option<Event> {
        if self.rt.state != TimerState::ConfirmationPending {
            return None;
        }
        let now = self.clock.now();
        self.rt.confirmation = None;
        self.rt.extending = true;
        self.rt.phase = Phase::Work;
        self.rt.session = Some(OpenSession {
            started_at: now,
            task: self.rt.last_task.clone(),
        });
        self.rt.countdown = Countdown::new(self.settings.extension_secs());
        self.run_current_phase(now);
        tracing::debug!(minutes = self.settings.extension_min, "work extended");
        Some(Event::WorkExtended {
            minutes: self.settings.extension_min,
            at: now,
        })
    }

    pub fn confirm_break(&mut self) -> Option<Event> {
        if self.rt.state != TimerState::ConfirmationPending {
            return None;
        }
        let now = self.clock.now();
        Some(self.proceed_to_break(now))
    }

    /// End the current break early. Does nothing outside the break phase.
    pub fn skip_break(&mut self, ledger: &dyn TaskLedger) -> Vec<Event> {
        let Phase::Break(kind) = self.rt.phase else {
            return Vec::new();
        };
        let now = self.clock.now();
        self.rt.countdown.freeze();
        let mut events = vec![Event::BreakSkipped { kind, at: now }];
        events.extend(self.enter_work(now, ledger));
        events
    }

    /// Replace the settings. When idle or paused the current phase is
    /// re-timed from the new durations.
    ///
    /// # Errors
    /// Returns the first out-of-range field; nothing changes in that case.
    pub fn update_settings(&mut self, settings: TimerSettings) -> Result<Event, ValidationError> {
        settings.validate()?;
        self.settings = settings;
        if matches!(self.rt.state, TimerState::Idle | TimerState::Paused) {
            self.rt.countdown = Countdown::new(self.current_phase_secs());
        }
        tracing::info!("timer settings updated");
        Ok(Event::SettingsUpdated {
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn current_phase_secs(&self) -> u64 {
        match self.rt.phase {
            Phase::Work if self.rt.extending => self.settings.extension_secs(),
            Phase::Work => self.settings.work_secs(),
            Phase::Break(kind) => self.settings.break_secs(kind),
        }
    }

    fn run_current_phase(&mut self, now: DateTime<Utc>) {
        self.rt.countdown.start(now);
        self.rt.state = match self.rt.phase {
            Phase::Work => TimerState::RunningWork,
            Phase::Break(kind) => TimerState::RunningBreak(kind),
        };
    }

    fn fallback_title(&self) -> &'static str {
        if !self.settings.dual_task_mode {
            return "Focus Session";
        }
        match self.rt.label {
            TaskLabel::A => "Task A",
            TaskLabel::B => "Task B",
        }
    }

    fn work_task(&self, ledger: &dyn TaskLedger) -> Option<TaskRef> {
        let mut tasks = ledger.active_tasks(2);
        let slot = match self.current_label() {
            TaskLabel::A => 0,
            TaskLabel::B => 1,
        };
        (slot < tasks.len()).then(|| tasks.swap_remove(slot))
    }

    fn open_session(&mut self, now: DateTime<Utc>, ledger: &dyn TaskLedger) {
        self.rt.session = Some(OpenSession {
            started_at: now,
            task: self.work_task(ledger),
        });
    }

    fn complete_work(&mut self, now: DateTime<Utc>, ledger: &mut dyn TaskLedger) -> Vec<Event> {
        let minutes = if self.rt.extending {
            self.settings.extension_min
        } else {
            self.settings.work_min
        };
        let ended_at = self.rt.countdown.deadline().map_or(now, |d| d.min(now));
        let session = self.rt.session.take();
        let started_at = session.as_ref().map_or_else(
            || ended_at - Duration::minutes(i64::from(minutes)),
            |s| s.started_at,
        );
        let task = session.and_then(|s| s.task);
        let label = self.current_label();
        let task_title = task
            .as_ref()
            .map_or_else(|| self.fallback_title().to_string(), |t| t.title.clone());

        if let Some(task) = &task {
            if !credit(ledger, task, minutes) {
                tracing::debug!(task = %task.title, "no task matched for time credit");
            }
        }

        self.sessions.append(SessionRecord {
            date: ended_at.date_naive(),
            label,
            task_title: task_title.clone(),
            task_id: task.as_ref().and_then(|t| t.id.clone()),
            started_at,
            ended_at,
            completed: true,
            minutes,
        });
        tracing::info!(round = self.rt.round, %label, task = %task_title, minutes, "work phase completed");

        self.rt.countdown.freeze();
        self.rt.extending = false;
        self.rt.last_task = task;
        self.rt.state = TimerState::ConfirmationPending;
        let timeout_secs = u64::from(self.settings.confirmation_secs);
        let mut confirmation = Countdown::new(timeout_secs);
        confirmation.start(now);
        self.rt.confirmation = Some(confirmation);

        self.notify(NotifyKind::WorkComplete, task_title.clone());

        vec![
            Event::WorkCompleted {
                round: self.rt.round,
                label,
                task_title,
                minutes,
                at: now,
            },
            Event::ConfirmationStarted {
                timeout_secs,
                at: now,
            },
        ]
    }

    fn proceed_to_break(&mut self, now: DateTime<Utc>) -> Event {
        let kind = self.settings.break_after_round(self.rt.round);
        self.rt.round = self.rt.round.saturating_add(1);
        if self.settings.dual_task_mode {
            self.rt.since_switch = self.rt.since_switch.saturating_add(1);
        }
        self.rt.confirmation = None;
        self.rt.phase = Phase::Break(kind);
        self.rt.countdown = Countdown::new(self.settings.break_secs(kind));
        let running = self.settings.auto_start_next_phase;
        if running {
            self.run_current_phase(now);
        } else {
            self.rt.state = TimerState::Idle;
        }
        tracing::debug!(?kind, round = self.rt.round, "break started");
        Event::BreakStarted {
            kind,
            duration_secs: self.rt.countdown.total_secs(),
            running,
            at: now,
        }
    }

    fn complete_break(
        &mut self,
        now: DateTime<Utc>,
        kind: BreakKind,
        ledger: &dyn TaskLedger,
    ) -> Vec<Event> {
        tracing::info!(?kind, "break completed");
        let mut events = vec![Event::BreakCompleted { kind, at: now }];
        events.extend(self.enter_work(now, ledger));
        let upcoming = self.current_task(ledger);
        self.notify(NotifyKind::BreakComplete, upcoming);
        events
    }

    fn enter_work(&mut self, now: DateTime<Utc>, ledger: &dyn TaskLedger) -> Vec<Event> {
        let mut events = Vec::new();
        if self.settings.dual_task_mode
            && self.rt.since_switch >= self.settings.switch_after_pomodoros
        {
            let from = self.rt.label;
            self.rt.label = from.flipped();
            self.rt.since_switch = 0;
            tracing::info!(%from, to = %self.rt.label, "task label switched");
            events.push(Event::LabelSwitched {
                from,
                to: self.rt.label,
                at: now,
            });
        }

        self.rt.phase = Phase::Work;
        self.rt.extending = false;
        self.rt.countdown = Countdown::new(self.settings.work_secs());
        let running = self.settings.auto_start_next_phase;
        if running {
            self.open_session(now, ledger);
            self.run_current_phase(now);
        } else {
            self.rt.session = None;
            self.rt.state = TimerState::Idle;
        }
        events.push(Event::WorkStarted {
            round: self.rt.round,
            label: self.current_label(),
            duration_secs: self.rt.countdown.total_secs(),
            running,
            at: now,
        });
        events
    }

    fn notify(&self, kind: NotifyKind, task_title: String) {
        let notification = Notification {
            kind,
            task_title,
            sound: self.settings.sound_enabled,
            vibrate: self.settings.vibration_enabled,
            banner: self.settings.notification_enabled,
        };
        if !notification.has_channel() {
            return;
        }
        if let Err(err) = self.notifier.notify(&notification) {
            tracing::warn!(?kind, error = %err, "notification failed");
        }
    }
}

/// Credit by captured id, falling back to the captured title.
fn credit(ledger: &mut dyn TaskLedger, task: &TaskRef, minutes: u32) -> bool {
    if let Some(id) = &task.id {
        if ledger.add_time_to_task_by_id(id, minutes) {
            return true;
        }
    }
    ledger.add_time_to_task(&task.title, minutes)
}
