//! Adapter types and utility functions for the Monica bridge binary.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use monica_config::data_dir;
use monica_core::Capabilities;
use monica_protocols::{
    BuildErrorSource, ConsoleErrorFeed, ConsoleErrorWatch, HostError, PreviewDocument,
    ReportChannel, ScreenshotCapturer,
};

const NO_PREVIEW: &str = "no studio preview is attached to the command line bridge";

/// Get the default config file path.
pub(crate) fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Capabilities used outside the browser: every page effect fails with a
/// structured error, so actions still produce a report.
pub(crate) struct DetachedPreview;

impl DetachedPreview {
    pub(crate) fn capabilities() -> Capabilities {
        let preview = Arc::new(DetachedPreview);
        Capabilities {
            build_errors: preview.clone(),
            console: preview.clone(),
            screenshots: preview.clone(),
            document: preview,
            reports: Arc::new(StdoutReportChannel),
        }
    }
}

#[async_trait]
impl BuildErrorSource for DetachedPreview {
    async fn build_errors(&self) -> Result<Vec<String>, HostError> {
        Err(HostError::Unsupported(NO_PREVIEW.to_string()))
    }
}

#[async_trait]
impl ConsoleErrorFeed for DetachedPreview {
    async fn watch(&self, frame_id: u32) -> Result<ConsoleErrorWatch, HostError> {
        Err(HostError::FrameInaccessible(format!("frame {}: {}", frame_id, NO_PREVIEW)))
    }
}

#[async_trait]
impl ScreenshotCapturer for DetachedPreview {
    async fn capture(&self) -> Result<String, HostError> {
        Err(HostError::Unsupported(NO_PREVIEW.to_string()))
    }
}

#[async_trait]
impl PreviewDocument for DetachedPreview {
    async fn body_markup(&self) -> Result<String, HostError> {
        Err(HostError::FrameInaccessible(NO_PREVIEW.to_string()))
    }

    async fn click(&self, _selector: &str) -> Result<(), HostError> {
        Err(HostError::FrameInaccessible(NO_PREVIEW.to_string()))
    }

    async fn text_content(&self, _selector: &str) -> Result<String, HostError> {
        Err(HostError::FrameInaccessible(NO_PREVIEW.to_string()))
    }
}

/// Prints forwarded reports on stdout.
pub(crate) struct StdoutReportChannel;

#[async_trait]
impl ReportChannel for StdoutReportChannel {
    async fn send(&self, message: &str) -> Result<(), HostError> {
        println!("{}\n", message);
        Ok(())
    }
}
