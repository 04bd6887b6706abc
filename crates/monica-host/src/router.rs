//! Request routing for the native messaging host.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use monica_protocols::{AUTOMATION_KEY, ContextStore, HostError};

use crate::messages::{HostRequest, HostResponse};

/// Browser-tab operations only the extension side can perform.
#[async_trait]
pub trait TabController: Send + Sync {
    /// Evaluate `script` in the given frame of the active tab.
    async fn inject_script(&self, frame_id: u32, script: &str) -> Result<Value, HostError>;

    /// Capture the visible tab as a PNG data URL.
    async fn capture_visible_tab(&self) -> Result<String, HostError>;
}

/// Answers extension requests against a context store.
pub struct HostRouter {
    store: Arc<dyn ContextStore>,
    tabs: Option<Arc<dyn TabController>>,
}

impl HostRouter {
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        Self { store, tabs: None }
    }

    /// Attach a tab controller for script injection and capture.
    pub fn with_tabs(mut self, tabs: Arc<dyn TabController>) -> Self {
        self.tabs = Some(tabs);
        self
    }

    pub async fn handle(&self, request: HostRequest) -> HostResponse {
        debug!("Handling {}", request_kind(&request));
        match request {
            HostRequest::SaveContext { project_id, data } => {
                let clearing = data.is_none();
                match self.store.save(&project_id, data).await {
                    Ok(()) => {
                        if clearing {
                            info!("Context cleared for project: {}", project_id);
                        } else {
                            info!("Context saved for project: {}", project_id);
                        }
                        HostResponse::success()
                    }
                    Err(e) => failure("save context", e),
                }
            }
            HostRequest::LoadContext { project_id } => match self.store.load(&project_id).await {
                Ok(data) => HostResponse::success().with("data", data.unwrap_or(Value::Null)),
                Err(e) => failure("load context", e).with("data", Value::Null),
            },
            HostRequest::GetAutomationState => {
                let active = match self.store.load(AUTOMATION_KEY).await {
                    Ok(value) => value.and_then(|v| v.as_bool()).unwrap_or(false),
                    Err(e) => {
                        warn!("Failed to read automation flag: {}", e);
                        false
                    }
                };
                HostResponse::success().with(AUTOMATION_KEY, active)
            }
            HostRequest::SetAutomationState {
                is_automation_active,
            } => match self
                .store
                .save(AUTOMATION_KEY, Some(Value::Bool(is_automation_active)))
                .await
            {
                Ok(()) => HostResponse::success(),
                Err(e) => failure("set automation state", e),
            },
            HostRequest::InjectScript { frame_id, script } => {
                let Some(tabs) = &self.tabs else {
                    return no_tabs();
                };
                match tabs.inject_script(frame_id, &script).await {
                    Ok(result) => HostResponse::success().with("result", result),
                    Err(e) => failure("inject script", e),
                }
            }
            HostRequest::CaptureScreenshot => {
                let Some(tabs) = &self.tabs else {
                    return no_tabs();
                };
                match tabs.capture_visible_tab().await {
                    Ok(data_url) => HostResponse::success().with("dataUrl", data_url),
                    Err(e) => failure("capture screenshot", e),
                }
            }
        }
    }
}

fn request_kind(request: &HostRequest) -> &'static str {
    match request {
        HostRequest::SaveContext { .. } => "SAVE_CONTEXT",
        HostRequest::LoadContext { .. } => "LOAD_CONTEXT",
        HostRequest::GetAutomationState => "GET_AUTOMATION_STATE",
        HostRequest::SetAutomationState { .. } => "SET_AUTOMATION_STATE",
        HostRequest::InjectScript { .. } => "INJECT_SCRIPT",
        HostRequest::CaptureScreenshot => "CAPTURE_SCREENSHOT",
    }
}

fn failure(operation: &str, error: impl std::fmt::Display) -> HostResponse {
    warn!("Failed to {}: {}", operation, error);
    HostResponse::error(error.to_string())
}

fn no_tabs() -> HostResponse {
    HostResponse::error(
        HostError::Unsupported("no browser tab is attached to this host".to_string()).to_string(),
    )
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
