//! Errors raised by host-page capabilities.

use thiserror::Error;

/// Failure of a capability that talks to the host page or browser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// A host element the bridge relies on (chat input, send button) is missing.
    #[error("Host element not found: {0}")]
    MissingElement(String),

    /// The embedded preview frame is missing or not readable.
    #[error("Preview frame is not accessible: {0}")]
    FrameInaccessible(String),

    /// No element in the preview matches the selector.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Screenshot capture failed: {0}")]
    Capture(String),

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Operation not supported by this host: {0}")]
    Unsupported(String),
}
