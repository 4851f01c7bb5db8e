use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{BreakKind, Phase, TaskLabel, TimerState};

/// Every state change of the engine produces an Event.
/// The CLI prints them; a GUI would render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        label: TaskLabel,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// A work phase ran out and its session was recorded.
    WorkCompleted {
        round: u32,
        label: TaskLabel,
        task_title: String,
        minutes: u32,
        at: DateTime<Utc>,
    },
    /// Waiting for the user to extend or take the break.
    ConfirmationStarted {
        timeout_secs: u64,
        at: DateTime<Utc>,
    },
    WorkExtended {
        minutes: u32,
        at: DateTime<Utc>,
    },
    BreakStarted {
        kind: BreakKind,
        duration_secs: u64,
        /// False when the break waits for an explicit start.
        running: bool,
        at: DateTime<Utc>,
    },
    BreakCompleted {
        kind: BreakKind,
        at: DateTime<Utc>,
    },
    BreakSkipped {
        kind: BreakKind,
        at: DateTime<Utc>,
    },
    WorkStarted {
        round: u32,
        label: TaskLabel,
        duration_secs: u64,
        running: bool,
        at: DateTime<Utc>,
    },
    LabelSwitched {
        from: TaskLabel,
        to: TaskLabel,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        at: DateTime<Utc>,
    },
    /// Full state snapshot (for UI sync).
    StateSnapshot {
        state: TimerState,
        phase: Phase,
        label: TaskLabel,
        round: u32,
        remaining_secs: u64,
        total_secs: u64,
        confirmation_left_secs: Option<u64>,
        today_count: usize,
        at: DateTime<Utc>,
    },
}
