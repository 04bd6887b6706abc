//! Action dispatch.
//!
//! Dispatch is split in two layers. [`ActionPlan::interpret`] decides what an
//! action command means without touching anything; [`ActionDispatcher`] runs
//! the plan against injected capabilities, drives the tag status board and
//! forwards the resulting [`Report`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use monica_config::DispatchConfig;
use monica_protocols::{
    ActionCommand, ActionName, BuildErrorSource, ConsoleErrorFeed, HostError, NoticeLevel,
    Notifier, PreviewDocument, Report, ReportChannel, ReportStatus, ScreenshotCapturer,
};

use crate::autofix::AutoFixer;
use crate::tags::TagStatusBoard;

/// Placeholder reported when the listen window closes without any error.
pub const NO_CONSOLE_ERRORS: &str = "No console errors detected.";

/// Tunables of the effect layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// How long to listen for console errors in the preview.
    pub preview_error_window: Duration,
    /// One-indexed frame hosting the preview.
    pub preview_frame_id: u32,
    /// Quiet period after a preview error is forwarded to the chat.
    pub automation_cooldown: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            preview_error_window: Duration::from_millis(config.preview_error_window_ms),
            preview_frame_id: config.preview_frame_id,
            automation_cooldown: Duration::from_millis(config.automation_cooldown_ms),
        }
    }
}

/// Effect capabilities the dispatcher runs against.
#[derive(Clone)]
pub struct Capabilities {
    pub build_errors: Arc<dyn BuildErrorSource>,
    pub console: Arc<dyn ConsoleErrorFeed>,
    pub screenshots: Arc<dyn ScreenshotCapturer>,
    pub document: Arc<dyn PreviewDocument>,
    pub reports: Arc<dyn ReportChannel>,
}

/// Sub-action of `INTERACT_ELEMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Click,
    GetText,
}

impl Interaction {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "click" => Some(Interaction::Click),
            "getText" => Some(Interaction::GetText),
            _ => None,
        }
    }
}

/// What an action command asks for, decided without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPlan {
    InspectPreview,
    CaptureScreenshot,
    ReadDom,
    Interact {
        selector: Option<String>,
        /// Raw sub-action name as sent; validated when the plan runs.
        interaction: Option<String>,
    },
}

impl ActionPlan {
    /// Interpret an action by name. `None` for names outside the supported set.
    pub fn interpret(action: &str, params: &Map<String, Value>) -> Option<Self> {
        let name: ActionName = action.parse().ok()?;
        Some(match name {
            ActionName::GetPreviewState => ActionPlan::InspectPreview,
            ActionName::TakeScreenshot => ActionPlan::CaptureScreenshot,
            ActionName::GetDomStructure => ActionPlan::ReadDom,
            ActionName::InteractElement => ActionPlan::Interact {
                selector: string_param(params, "selector"),
                interaction: string_param(params, "action"),
            },
        })
    }

    pub fn action(&self) -> ActionName {
        match self {
            ActionPlan::InspectPreview => ActionName::GetPreviewState,
            ActionPlan::CaptureScreenshot => ActionName::TakeScreenshot,
            ActionPlan::ReadDom => ActionName::GetDomStructure,
            ActionPlan::Interact { .. } => ActionName::InteractElement,
        }
    }
}

fn string_param(params: &Map<String, Value>, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Runs action plans and reports their results.
pub struct ActionDispatcher {
    caps: Capabilities,
    settings: DispatchSettings,
    notifier: Arc<dyn Notifier>,
}

impl ActionDispatcher {
    pub fn new(caps: Capabilities, settings: DispatchSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            caps,
            settings,
            notifier,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// An [`AutoFixer`] sharing this dispatcher's capabilities and settings.
    pub fn auto_fixer(&self) -> AutoFixer {
        AutoFixer::new(&self.caps, self.settings, self.notifier.clone())
    }

    /// Execute one action command.
    ///
    /// Returns `None` (and leaves every tag untouched) when the action name is
    /// not supported. Otherwise the tag goes Running, then Success or Error,
    /// and the report is forwarded to the report channel before returning.
    pub async fn dispatch(&self, command: &ActionCommand, tags: &mut TagStatusBoard) -> Option<Report> {
        let Some(plan) = ActionPlan::interpret(&command.action, &command.params) else {
            warn!("Ignoring unknown action: {}", command.action);
            self.notifier.notify(
                NoticeLevel::Error,
                &format!("Unknown action: {}", command.action),
            );
            return None;
        };

        let action = plan.action();
        info!("Dispatching {}", action);
        self.notifier
            .notify(NoticeLevel::Info, &format!("Executing: {}", action));
        tags.mark_running(action);

        let report = self.execute(&plan).await;

        tags.mark_finished(action, report.status);
        self.forward(&report).await;

        Some(report)
    }

    async fn execute(&self, plan: &ActionPlan) -> Report {
        match plan {
            ActionPlan::InspectPreview => self.inspect_preview().await,
            ActionPlan::CaptureScreenshot => self.capture_screenshot().await,
            ActionPlan::ReadDom => self.read_dom().await,
            ActionPlan::Interact {
                selector,
                interaction,
            } => self.interact(selector.as_deref(), interaction.as_deref()).await,
        }
    }

    async fn inspect_preview(&self) -> Report {
        let action = ActionName::GetPreviewState;
        let mut payload = Map::new();
        let mut failures = Vec::new();

        let build_errors = match self.caps.build_errors.build_errors().await {
            Ok(errors) => errors,
            Err(e) => {
                failures.push(e.to_string());
                Vec::new()
            }
        };
        payload.insert("studioBuildErrors".into(), json!(build_errors));

        let console_errors = match collect_console_errors(
            self.caps.console.as_ref(),
            self.settings.preview_frame_id,
            self.settings.preview_error_window,
        )
        .await
        {
            Ok(errors) if errors.is_empty() => vec![NO_CONSOLE_ERRORS.to_string()],
            Ok(errors) => errors,
            Err(e) => {
                failures.push(e.to_string());
                Vec::new()
            }
        };
        payload.insert("previewConsoleErrors".into(), json!(console_errors));

        if failures.is_empty() {
            Report::success(action, payload)
        } else {
            payload.insert("previewStateError".into(), json!(failures.join("; ")));
            Report::error(action, payload)
        }
    }

    async fn capture_screenshot(&self) -> Report {
        let action = ActionName::TakeScreenshot;
        match self.caps.screenshots.capture().await {
            Ok(data_url) => Report::success(action, single("screenshotDataUrl", data_url)),
            Err(e) => Report::error(action, single("screenshotError", e.to_string())),
        }
    }

    async fn read_dom(&self) -> Report {
        let action = ActionName::GetDomStructure;
        match self.caps.document.body_markup().await {
            Ok(markup) => Report::success(action, single("domStructure", markup)),
            Err(e) => Report::error(action, single("domError", e.to_string())),
        }
    }

    async fn interact(&self, selector: Option<&str>, interaction: Option<&str>) -> Report {
        let action = ActionName::InteractElement;
        let fail = |message: String| Report::error(action, single("interactionError", message));

        let Some(selector) = selector else {
            return fail("Missing required parameter: selector".to_string());
        };
        let Some(name) = interaction else {
            return fail("Missing required parameter: action".to_string());
        };
        let Some(interaction) = Interaction::parse(name) else {
            return fail(format!("Unsupported interaction: {}", name));
        };

        let result = match interaction {
            Interaction::Click => self
                .caps
                .document
                .click(selector)
                .await
                .map(|()| format!("Clicked element: {}", selector)),
            Interaction::GetText => self
                .caps
                .document
                .text_content(selector)
                .await
                .map(|text| text.trim().to_string()),
        };

        match result {
            Ok(message) => Report::success(action, single("interactionResult", message)),
            Err(HostError::ElementNotFound(_)) => fail(format!("Element not found: {}", selector)),
            Err(e) => fail(e.to_string()),
        }
    }

    async fn forward(&self, report: &Report) {
        if let Err(e) = self.caps.reports.send(&report.to_chat_message()).await {
            warn!("Failed to forward {} report: {}", report.action, e);
            self.notifier.notify(
                NoticeLevel::Error,
                &format!("Could not send {} report: {}", report.action, e),
            );
            return;
        }

        let level = match report.status {
            ReportStatus::Success => NoticeLevel::Success,
            ReportStatus::Error => NoticeLevel::Error,
        };
        self.notifier
            .notify(level, &format!("Sent {} report", report.action));
    }
}

/// Listen on the preview frame until the window closes or the feed ends.
pub(crate) async fn collect_console_errors(
    console: &dyn ConsoleErrorFeed,
    frame_id: u32,
    window: Duration,
) -> Result<Vec<String>, HostError> {
    let mut watch = console.watch(frame_id).await?;
    let deadline = Instant::now() + window;
    let mut errors = Vec::new();

    while let Ok(Some(error)) = tokio::time::timeout_at(deadline, watch.next()).await {
        errors.push(error);
    }

    drop(watch);
    debug!("Collected {} console errors from preview", errors.len());
    Ok(errors)
}

fn single(key: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value.into());
    map
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
