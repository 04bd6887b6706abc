//! Commands embedded in AI-generated chat output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A command recognised in a block of chat output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Request for a side-effecting action whose result is reported back.
    Action(ActionCommand),
    /// Partial conversation state to merge into the persisted context.
    Update(UpdateCommand),
    /// Free-text changelog entry to accumulate for the next commit.
    Changelog { text: String },
}

/// Payload of a `MONICA_ACTION` marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCommand {
    /// Wire name of the action, e.g. `TAKE_SCREENSHOT`.
    pub action: String,

    /// Action parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ActionCommand {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Resolve the wire name against the closed set of supported actions.
    pub fn name(&self) -> Option<ActionName> {
        self.action.parse().ok()
    }
}

/// Payload of a `MONICA_UPDATE` or `MONICA_CONTEXT_DATA` marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateCommand {
    /// Short summary of the turn that produced this update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Partial conversation state.
    #[serde(default)]
    pub context_update: Map<String, Value>,
}

/// The closed set of dispatchable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionName {
    GetPreviewState,
    TakeScreenshot,
    GetDomStructure,
    InteractElement,
}

impl ActionName {
    pub const ALL: [ActionName; 4] = [
        ActionName::GetPreviewState,
        ActionName::TakeScreenshot,
        ActionName::GetDomStructure,
        ActionName::InteractElement,
    ];

    /// Wire name used inside action markers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::GetPreviewState => "GET_PREVIEW_STATE",
            ActionName::TakeScreenshot => "TAKE_SCREENSHOT",
            ActionName::GetDomStructure => "GET_DOM_STRUCTURE",
            ActionName::InteractElement => "INTERACT_ELEMENT",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an action name is outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for ActionName {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
