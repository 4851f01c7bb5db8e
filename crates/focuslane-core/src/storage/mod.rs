mod config;
pub mod database;
pub mod keypath;
pub mod memory;

pub use config::{Config, LoggingConfig, StorageConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StorageError};

/// Stable persistence keys. Changing any of these orphans existing data.
pub mod keys {
    pub const SETTINGS: &str = "focuslane.settings";
    pub const TASKS: &str = "focuslane.tasks";
    pub const DISPLAY_ORDER: &str = "focuslane.display_order";
    pub const FOCUS_PIN: &str = "focuslane.focus_pin";
    pub const SESSIONS: &str = "focuslane.sessions";
    pub const TIMER_STATE: &str = "focuslane.timer_state";
}

/// Durable key -> JSON blob store with synchronous access.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Returns the data directory, creating it if needed.
///
/// `FOCUSLANE_HOME` wins when set. Otherwise `~/.config/focuslane[-dev]/`
/// based on `FOCUSLANE_ENV`; set `FOCUSLANE_ENV=dev` for a development data
/// directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("FOCUSLANE_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSLANE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focuslane-dev")
            } else {
                base_dir.join("focuslane")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| StorageError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Best-effort load of a JSON blob.
///
/// Missing keys, unreadable stores and corrupt blobs all yield `T::default()`.
/// Faults are logged, never returned.
pub fn load_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KvStore + ?Sized,
{
    match store.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "stored blob is corrupt, falling back to defaults");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored blob, falling back to defaults");
            T::default()
        }
    }
}

/// Serialize `value` and write it under `key`.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KvStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}
