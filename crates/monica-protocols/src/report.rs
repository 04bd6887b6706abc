//! Action reports posted back into the host chat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::command::ActionName;

/// Outcome of a dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Error,
}

/// Result of one dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub action: ActionName,
    pub status: ReportStatus,
    /// Action-specific result keys, e.g. `screenshotDataUrl` or `screenshotError`.
    pub payload: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    pub fn success(action: ActionName, payload: Map<String, Value>) -> Self {
        Self {
            action,
            status: ReportStatus::Success,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn error(action: ActionName, payload: Map<String, Value>) -> Self {
        Self {
            action,
            status: ReportStatus::Error,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }

    /// Render the report as the chat message sent back to the AI.
    pub fn to_chat_message(&self) -> String {
        let status = match self.status {
            ReportStatus::Success => "success",
            ReportStatus::Error => "error",
        };
        let body = serde_json::to_string_pretty(&self.payload).unwrap_or_else(|_| "{}".to_string());
        format!(
            "[AI Bridge Report] {} ({})\n```json\n{}\n```",
            self.action, status, body
        )
    }
}
