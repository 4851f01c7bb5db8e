//! Phase-transition notifications.
//!
//! Notifications are a side channel. The engine hands a [`Notification`] to a
//! [`Notifier`] and forgets about it; a failing notifier is logged and never
//! changes timer state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyKind {
    WorkComplete,
    BreakComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotifyKind,
    pub task_title: String,
    /// Audible cue requested.
    pub sound: bool,
    /// Haptic cue requested.
    pub vibrate: bool,
    /// System banner requested.
    pub banner: bool,
}

impl Notification {
    /// True when at least one output channel is enabled.
    pub fn has_channel(&self) -> bool {
        self.sound || self.vibrate || self.banner
    }

    pub fn headline(&self) -> String {
        match self.kind {
            NotifyKind::WorkComplete => format!("Focus complete: \"{}\". Time for a break.", self.task_title),
            NotifyKind::BreakComplete => "Break is over. Ready for the next round.".to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Notification channel unsupported: {0}")]
    Unsupported(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = ?notification.kind,
            task = %notification.task_title,
            "{}",
            notification.headline()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: NotifyKind) -> Notification {
        Notification {
            kind,
            task_title: "Write".into(),
            sound: false,
            vibrate: false,
            banner: true,
        }
    }

    #[test]
    fn headline_mentions_task_on_work_complete() {
        assert!(sample(NotifyKind::WorkComplete).headline().contains("\"Write\""));
        assert!(!sample(NotifyKind::BreakComplete).headline().contains("Write"));
    }

    #[test]
    fn has_channel_false_when_everything_disabled() {
        let mut n = sample(NotifyKind::WorkComplete);
        assert!(n.has_channel());
        n.banner = false;
        assert!(!n.has_channel());
    }

    #[test]
    fn log_notifier_accepts_every_kind() {
        assert!(LogNotifier.notify(&sample(NotifyKind::WorkComplete)).is_ok());
        assert!(LogNotifier.notify(&sample(NotifyKind::BreakComplete)).is_ok());
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_string(&NotifyKind::WorkComplete).unwrap();
        assert_eq!(json, "\"work-complete\"");
    }
}
