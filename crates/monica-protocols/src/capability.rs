//! Capabilities the bridge uses to act on the host page.
//!
//! The dispatcher never touches the page directly; each effect is reached
//! through one of these traits so tests (and non-browser hosts) can supply
//! their own implementations.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::command::ActionName;
use crate::error::HostError;
use crate::status::TagEntry;

/// Reads the build errors currently shown by the studio.
#[async_trait]
pub trait BuildErrorSource: Send + Sync {
    async fn build_errors(&self) -> Result<Vec<String>, HostError>;
}

/// Subscribes to runtime console errors raised inside the preview frame.
#[async_trait]
pub trait ConsoleErrorFeed: Send + Sync {
    /// Start listening on the given frame (one-indexed).
    async fn watch(&self, frame_id: u32) -> Result<ConsoleErrorWatch, HostError>;
}

/// Captures the visible tab.
#[async_trait]
pub trait ScreenshotCapturer: Send + Sync {
    /// Returns the capture as a data URL.
    async fn capture(&self) -> Result<String, HostError>;
}

/// Queries and drives the document inside the preview frame.
#[async_trait]
pub trait PreviewDocument: Send + Sync {
    /// Serialized markup of the preview document body.
    async fn body_markup(&self) -> Result<String, HostError>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), HostError>;

    /// Text content of the first element matching `selector`.
    async fn text_content(&self, selector: &str) -> Result<String, HostError>;
}

/// Posts a message through the host chat input.
#[async_trait]
pub trait ReportChannel: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), HostError>;
}

/// Receives every tag status transition as it happens.
pub trait StatusObserver: Send + Sync {
    fn status_changed(&self, action: ActionName, entry: &TagEntry);
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// User-visible log (the bridge panel).
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// A live console-error subscription.
///
/// Dropping the watch deregisters the listener: the sending side observes a
/// closed channel and the optional release hook runs.
pub struct ConsoleErrorWatch {
    receiver: mpsc::UnboundedReceiver<String>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ConsoleErrorWatch {
    /// Create a watch together with the sender the host pushes errors into.
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                receiver: rx,
                release: None,
            },
        )
    }

    /// Run `release` when the watch is dropped.
    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// Next reported error; `None` once the host stops sending.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

impl Drop for ConsoleErrorWatch {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for ConsoleErrorWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleErrorWatch")
            .field("has_release", &self.release.is_some())
            .finish()
    }
}
