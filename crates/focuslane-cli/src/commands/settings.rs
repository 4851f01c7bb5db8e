use clap::Subcommand;
use focuslane_core::{Config, TimerSettings};

use super::{open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a timer setting
    Get {
        /// Setting key (e.g. "work_min", "dual_task_mode")
        key: String,
    },
    /// Set a timer setting
    Set {
        /// Setting key
        key: String,
        /// New value
        value: String,
    },
    /// List all timer settings
    List,
    /// Reset timer settings to defaults
    Reset,
}

pub fn run(action: SettingsAction, config: &Config) -> CmdResult {
    let super::Session { mut ws, .. } = open(config)?;

    match action {
        SettingsAction::Get { key } => match ws.engine().settings().get(&key) {
            Some(value) => println!("{value}"),
            None => return Err(format!("unknown key: {key}").into()),
        },
        SettingsAction::Set { key, value } => {
            ws.set_setting(&key, &value)?;
            println!("ok");
        }
        SettingsAction::List => print_json(ws.engine().settings())?,
        SettingsAction::Reset => {
            ws.update_settings(TimerSettings::default())?;
            println!("settings reset to defaults");
        }
    }

    ws.save()?;
    Ok(())
}
