use std::io::Write;

use focuslane_core::{Notification, Notifier, NotifyError};

/// Rings the terminal bell and prints a banner line on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if !notification.sound && !notification.banner {
            return Err(NotifyError::Unsupported("vibration".to_string()));
        }
        let mut err = std::io::stderr().lock();
        let bell = if notification.sound { "\x07" } else { "" };
        let written = if notification.banner {
            writeln!(err, "{bell}{}", notification.headline())
        } else {
            write!(err, "{bell}")
        };
        written.map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}
