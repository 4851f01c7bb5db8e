use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use focuslane_core::{Config, LabelCounts};
use serde::Serialize;

use super::{open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's completed sessions
    Today,
    /// Today, yesterday and this week
    Summary,
    /// Latest session records, newest first
    Recent {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Serialize)]
struct DayStats {
    date: NaiveDate,
    completed: usize,
    by_label: LabelCounts,
    focus_minutes: u64,
}

pub fn run(action: StatsAction, config: &Config) -> CmdResult {
    let super::Session { mut ws, .. } = open(config)?;
    let today = Utc::now().date_naive();
    let log = ws.engine().sessions();

    match action {
        StatsAction::Today => {
            let stats = DayStats {
                date: today,
                completed: log.count_on(today),
                by_label: log.count_on_by_label(today),
                focus_minutes: log.focus_minutes_on(today),
            };
            print_json(&stats)?;
        }
        StatsAction::Summary => print_json(&log.summary(today))?,
        StatsAction::Recent { limit } => print_json(&log.recent(limit))?,
    }

    // Opening may have completed a phase; keep that.
    ws.save()?;
    Ok(())
}
