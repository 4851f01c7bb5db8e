use clap::Subcommand;
use focuslane_core::{Config, Event};
use serde::Serialize;

use super::{open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current phase
    Start,
    /// Pause the running phase
    Pause,
    /// Back to idle with a full countdown for the current phase
    Reset,
    /// Keep working on the finished task for a few more minutes
    Extend,
    /// Take the break now instead of waiting for the timeout
    Confirm,
    /// End the current break early
    Skip,
    /// Observe the clock (what a periodic refresh does)
    Tick,
    /// Observe the clock after the host woke from suspension
    Resume,
    /// Print the current timer state
    Status,
}

#[derive(Serialize)]
struct TimerReport {
    events: Vec<Event>,
    current_task: String,
    snapshot: Event,
}

pub fn run(action: TimerAction, config: &Config) -> CmdResult {
    let super::Session { mut ws, mut caught_up } = open(config)?;

    let events: Vec<Event> = match action {
        TimerAction::Start => ws.start().into_iter().collect(),
        TimerAction::Pause => ws.pause(),
        TimerAction::Reset => vec![ws.reset()],
        TimerAction::Extend => ws.extend_current_task().into_iter().collect(),
        TimerAction::Confirm => ws.confirm_break().into_iter().collect(),
        TimerAction::Skip => ws.skip_break(),
        TimerAction::Tick => ws.tick(),
        TimerAction::Resume => ws.resume(),
        TimerAction::Status => Vec::new(),
    };
    caught_up.extend(events);

    let report = TimerReport {
        events: caught_up,
        current_task: ws.current_task(),
        snapshot: ws.snapshot(),
    };
    ws.save()?;
    print_json(&report)
}
