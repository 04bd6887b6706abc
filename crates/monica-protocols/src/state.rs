//! Conversation state and its persisted form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema-less conversation state. No field is required.
pub type ConversationState = Map<String, Value>;

/// Conventional key holding the ordered message log.
pub const MESSAGES_KEY: &str = "messages";

/// Store key of the global automation flag, shared by every project.
pub const AUTOMATION_KEY: &str = "isAutomationActive";

/// One entry of the message log kept inside the conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Full text of the turn.
    pub text: String,
    pub summary: String,
    /// Sender role, e.g. "ai".
    pub sender: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(text: impl Into<String>, summary: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            summary: summary.into(),
            sender: sender.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Value stored under a project identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    #[serde(default)]
    pub conversation_state: ConversationState,

    #[serde(default)]
    pub cumulative_changelog: String,
}

impl PersistedRecord {
    /// Read a stored value.
    ///
    /// Records written by older bridges hold the bare state object; those are
    /// accepted as the conversation state with an empty changelog.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(map)
                if map.contains_key("conversationState")
                    || map.contains_key("cumulativeChangelog") =>
            {
                serde_json::from_value(Value::Object(map))
            }
            Value::Object(map) => Ok(Self {
                conversation_state: map,
                cumulative_changelog: String::new(),
            }),
            other => serde_json::from_value(other),
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
