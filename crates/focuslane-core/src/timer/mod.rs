mod countdown;
mod engine;
mod ledger;
mod settings;

pub use countdown::Countdown;
pub use engine::{FocusEngine, Phase, RuntimeState, TaskLabel, TimerState};
pub use ledger::{TaskLedger, TaskRef};
pub use settings::{BreakKind, TimerSettings, MAX_CONFIRMATION_SECS, MAX_CYCLE, MAX_PHASE_MIN};
