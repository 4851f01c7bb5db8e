use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};
use crate::storage::keypath;

/// Which break follows a work phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

/// User-tunable timer settings.
///
/// Loaded once at startup, changed through `update_settings`, persisted on
/// every change. Unknown or missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_work_min")]
    pub work_min: u32,
    #[serde(default = "default_short_break_min")]
    pub short_break_min: u32,
    #[serde(default = "default_long_break_min")]
    pub long_break_min: u32,
    /// Length of an "extend current task" run.
    #[serde(default = "default_extension_min")]
    pub extension_min: u32,
    /// Every Nth completed round is followed by a long break.
    #[serde(default = "default_long_break_every")]
    pub long_break_every: u32,
    #[serde(default = "default_true")]
    pub dual_task_mode: bool,
    #[serde(default = "default_switch_after")]
    pub switch_after_pomodoros: u32,
    /// Seconds before a pending confirmation resolves to a break on its own.
    #[serde(default = "default_confirmation_secs")]
    pub confirmation_secs: u32,
    /// Run the next phase immediately instead of waiting for `start`.
    #[serde(default = "default_true")]
    pub auto_start_next_phase: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
    #[serde(default = "default_true")]
    pub notification_enabled: bool,
}

pub const MAX_PHASE_MIN: u32 = 240;
pub const MAX_CYCLE: u32 = 24;
pub const MAX_CONFIRMATION_SECS: u32 = 300;

fn default_work_min() -> u32 {
    25
}
fn default_short_break_min() -> u32 {
    5
}
fn default_long_break_min() -> u32 {
    15
}
fn default_extension_min() -> u32 {
    5
}
fn default_long_break_every() -> u32 {
    4
}
fn default_switch_after() -> u32 {
    2
}
fn default_confirmation_secs() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_min: default_work_min(),
            short_break_min: default_short_break_min(),
            long_break_min: default_long_break_min(),
            extension_min: default_extension_min(),
            long_break_every: default_long_break_every(),
            dual_task_mode: true,
            switch_after_pomodoros: default_switch_after(),
            confirmation_secs: default_confirmation_secs(),
            auto_start_next_phase: true,
            sound_enabled: true,
            vibration_enabled: true,
            notification_enabled: true,
        }
    }
}

fn check(field: &str, value: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: value.into(),
            min: min.into(),
            max: max.into(),
        })
    }
}

impl TimerSettings {
    /// # Errors
    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check("work_min", self.work_min, 1, MAX_PHASE_MIN)?;
        check("short_break_min", self.short_break_min, 1, MAX_PHASE_MIN)?;
        check("long_break_min", self.long_break_min, 1, MAX_PHASE_MIN)?;
        check("extension_min", self.extension_min, 1, MAX_PHASE_MIN)?;
        check("long_break_every", self.long_break_every, 1, MAX_CYCLE)?;
        check("switch_after_pomodoros", self.switch_after_pomodoros, 1, MAX_CYCLE)?;
        check("confirmation_secs", self.confirmation_secs, 1, MAX_CONFIRMATION_SECS)?;
        Ok(())
    }

    pub fn work_secs(&self) -> u64 {
        u64::from(self.work_min) * 60
    }

    pub fn extension_secs(&self) -> u64 {
        u64::from(self.extension_min) * 60
    }

    pub fn break_secs(&self, kind: BreakKind) -> u64 {
        let min = match kind {
            BreakKind::Short => self.short_break_min,
            BreakKind::Long => self.long_break_min,
        };
        u64::from(min) * 60
    }

    /// Break that follows the work phase of `round` (1-based).
    pub fn break_after_round(&self, round: u32) -> BreakKind {
        if self.long_break_every > 0 && round % self.long_break_every == 0 {
            BreakKind::Long
        } else {
            BreakKind::Short
        }
    }

    /// Get a setting as string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        keypath::get(self, key)
    }

    /// Return a copy with `key` set to `value`, validated.
    ///
    /// # Errors
    /// Returns an error for unknown keys, unparsable values or values out of
    /// range.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self, CoreError> {
        let updated: TimerSettings = keypath::set(self, key, value)?;
        updated.validate()?;
        Ok(updated)
    }

    /// Every setting as `(key, value)` pairs.
    pub fn entries(&self) -> Vec<(String, String)> {
        keypath::list(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_cadence() {
        let s = TimerSettings::default();
        assert_eq!(s.work_secs(), 1500);
        assert_eq!(s.break_secs(BreakKind::Short), 300);
        assert_eq!(s.break_secs(BreakKind::Long), 900);
        assert_eq!(s.extension_secs(), 300);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn every_fourth_round_gets_long_break() {
        let s = TimerSettings::default();
        let kinds: Vec<BreakKind> = (1..=8).map(|r| s.break_after_round(r)).collect();
        assert_eq!(
            kinds,
            vec![
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Long,
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Short,
                BreakKind::Long,
            ]
        );
    }

    #[test]
    fn validate_rejects_zero_duration() {
        let s = TimerSettings {
            work_min: 0,
            ..TimerSettings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "work_min"
        ));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let s: TimerSettings = serde_json::from_str(r#"{"work_min": 50}"#).unwrap();
        assert_eq!(s.work_min, 50);
        assert_eq!(s.short_break_min, 5);
        assert!(s.dual_task_mode);
    }

    #[test]
    fn with_value_sets_and_validates() {
        let s = TimerSettings::default();
        let s2 = s.with_value("work_min", "45").unwrap();
        assert_eq!(s2.work_min, 45);
        assert!(s.with_value("work_min", "0").is_err());
        assert!(s.with_value("dual_task_mode", "nope").is_err());
        assert!(s.with_value("bogus", "1").is_err());
        assert_eq!(s.get("dual_task_mode").as_deref(), Some("true"));
    }
}
