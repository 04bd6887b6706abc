//! Messages exchanged with the browser extension.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A request sent by the extension, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostRequest {
    /// Store `data` under the project key. An explicit null `data` removes
    /// the record; a request without `data` is rejected.
    SaveContext {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(deserialize_with = "required_nullable")]
        data: Option<Value>,
    },
    LoadContext {
        #[serde(rename = "projectId")]
        project_id: String,
    },
    GetAutomationState,
    SetAutomationState {
        #[serde(rename = "isAutomationActive")]
        is_automation_active: bool,
    },
    /// Run a script in a frame of the active tab (one-indexed).
    InjectScript {
        #[serde(rename = "frameId")]
        frame_id: u32,
        script: String,
    },
    CaptureScreenshot,
}

/// Without `default`, a field read through `deserialize_with` must be present.
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Reply to a [`HostRequest`]. Payload keys sit next to `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostResponse {
    pub status: ResponseStatus,

    #[serde(flatten)]
    pub payload: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostResponse {
    pub fn success() -> Self {
        Self {
            status: ResponseStatus::Success,
            payload: Map::new(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            payload: Map::new(),
            error: Some(message.into()),
        }
    }

    /// Add a payload entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
