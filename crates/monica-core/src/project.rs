//! Project identifiers derived from the studio URL.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

const DRIVE_SEGMENT: &str = "drive";

/// Key under which one project's context is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Wrap an explicit identifier. Empty or blank identifiers are rejected.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Derive the identifier from a studio URL: the path segment following
    /// `drive`, e.g. `https://studio.example/apps/drive/abc123?x=1` gives
    /// `abc123`.
    ///
    /// Bare paths (starting with `/`) are accepted as well.
    pub fn from_url(url: &str) -> Option<Self> {
        let url = url.trim();
        let path = if url.starts_with('/') {
            url.split(['?', '#']).next().unwrap_or_default().to_string()
        } else {
            Url::parse(url).ok()?.path().to_string()
        };

        let mut segments = path.split('/');
        segments.find(|segment| *segment == DRIVE_SEGMENT)?;
        segments.next().and_then(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
