pub mod config;
pub mod settings;
pub mod stats;
pub mod task;
pub mod timer;

use std::error::Error;
use std::io::IsTerminal;
use std::sync::Arc;

use focuslane_core::{Config, Database, Event, LogNotifier, Notifier, SystemClock, Workspace};

use crate::notifier::TerminalNotifier;

pub type CmdResult<T = ()> = Result<T, Box<dyn Error>>;

/// An opened workspace plus whatever the timer did while no process was
/// running.
pub struct Session {
    pub ws: Workspace<Database>,
    pub caught_up: Vec<Event>,
}

/// Open the database named in `config` and let the engine observe the time
/// that passed since the previous invocation.
pub fn open(config: &Config) -> CmdResult<Session> {
    let db = Database::open(&config.storage.database_file)?;
    let mut ws = Workspace::open(
        db,
        Arc::new(SystemClock),
        notifier(),
        config.storage.session_retention,
    );
    let caught_up = ws.resume();
    tracing::debug!(
        db = %config.storage.database_file,
        caught_up = caught_up.len(),
        "workspace ready"
    );
    Ok(Session { ws, caught_up })
}

/// Bell and banner when someone is watching stderr, the log otherwise.
fn notifier() -> Box<dyn Notifier> {
    if std::io::stderr().is_terminal() {
        Box::new(TerminalNotifier)
    } else {
        Box::new(LogNotifier)
    }
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
