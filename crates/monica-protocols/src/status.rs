//! Transient run-state of dispatchable actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagState {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

/// Status of one action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagEntry {
    pub status: TagState,
    /// When the action last finished.
    pub last_run: Option<DateTime<Utc>>,
}
