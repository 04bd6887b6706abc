//! Automatic forwarding of preview errors to the chat.
//!
//! While automation is on, a detected build error asks the assistant for an
//! auto-fix and detected console errors are sent for analysis. After a
//! forward the fixer stays quiet for the configured cooldown so one broken
//! build does not flood the conversation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use monica_protocols::{BuildErrorSource, ConsoleErrorFeed, NoticeLevel, Notifier, ReportChannel};

use crate::dispatcher::{Capabilities, DispatchSettings, collect_console_errors};

/// An error found in the preview and forwarded to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    /// The studio failed to build the app.
    Build(Vec<String>),
    /// The running preview logged errors.
    Console(Vec<String>),
}

impl PreviewError {
    /// The chat message asking the assistant to deal with this error.
    pub fn prompt(&self) -> String {
        match self {
            PreviewError::Build(errors) => format!(
                "The build failed. Please auto-fix the following errors.\n\nErrors:\n```\n{}\n```",
                errors.join("\n")
            ),
            PreviewError::Console(errors) => format!(
                "I've encountered a runtime error in the preview. Please analyze and fix it.\n\nError:\n```\n{}\n```",
                errors.join("\n")
            ),
        }
    }
}

/// Detects preview errors and forwards them, at most once per cooldown.
pub struct AutoFixer {
    build_errors: Arc<dyn BuildErrorSource>,
    console: Arc<dyn ConsoleErrorFeed>,
    reports: Arc<dyn ReportChannel>,
    frame_id: u32,
    window: Duration,
    cooldown: Duration,
    quiet_until: Option<Instant>,
    notifier: Arc<dyn Notifier>,
}

impl AutoFixer {
    pub fn new(caps: &Capabilities, settings: DispatchSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            build_errors: caps.build_errors.clone(),
            console: caps.console.clone(),
            reports: caps.reports.clone(),
            frame_id: settings.preview_frame_id,
            window: settings.preview_error_window,
            cooldown: settings.automation_cooldown,
            quiet_until: None,
            notifier,
        }
    }

    /// Whether a forward happened less than one cooldown ago.
    pub fn cooling_down(&self) -> bool {
        self.quiet_until.is_some_and(|until| Instant::now() < until)
    }

    /// Look for preview errors and forward the first kind found.
    ///
    /// Build errors win over console errors. Returns what was forwarded, or
    /// `None` when cooling down, when the preview is clean, or when the
    /// message could not be sent.
    pub async fn check(&mut self) -> Option<PreviewError> {
        if self.cooling_down() {
            debug!("Automation cooling down, not checking preview");
            return None;
        }

        let detected = self.detect().await?;
        if let Err(e) = self.reports.send(&detected.prompt()).await {
            warn!("Failed to forward preview error: {}", e);
            self.notifier.notify(
                NoticeLevel::Error,
                &format!("Could not send preview error: {}", e),
            );
            return None;
        }

        self.quiet_until = Some(Instant::now() + self.cooldown);
        let notice = match &detected {
            PreviewError::Build(_) => "Build error detected. Requested auto-fix.",
            PreviewError::Console(_) => "Error sent to AI for analysis.",
        };
        info!("{}", notice);
        self.notifier.notify(NoticeLevel::Success, notice);
        Some(detected)
    }

    async fn detect(&self) -> Option<PreviewError> {
        match self.build_errors.build_errors().await {
            Ok(errors) if !errors.is_empty() => return Some(PreviewError::Build(errors)),
            Ok(_) => {}
            Err(e) => debug!("Build errors unavailable: {}", e),
        }

        match collect_console_errors(self.console.as_ref(), self.frame_id, self.window).await {
            Ok(errors) if !errors.is_empty() => Some(PreviewError::Console(errors)),
            Ok(_) => None,
            Err(e) => {
                debug!("Console errors unavailable: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "autofix_tests.rs"]
mod tests;
