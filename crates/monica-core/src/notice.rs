//! Notifiers that route user-facing notices into the log.

use tracing::{error, info};

use monica_protocols::{NoticeLevel, Notifier};

/// Writes notices as tracing events under the `monica::notice` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => info!(target: "monica::notice", "{}", message),
            NoticeLevel::Success => info!(target: "monica::notice", success = true, "{}", message),
            NoticeLevel::Error => error!(target: "monica::notice", "{}", message),
        }
    }
}
