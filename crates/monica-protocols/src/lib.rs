//! # Monica Protocols
//!
//! Shared definitions for the Monica bridge.
//! Contains only data types and interface definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`ContextStore`] - Per-project persistence of conversation context
//! - [`BuildErrorSource`], [`ConsoleErrorFeed`], [`ScreenshotCapturer`],
//!   [`PreviewDocument`] - Effect capabilities used by the action dispatcher
//! - [`ReportChannel`] - Where action reports are posted (the host chat input)
//! - [`StatusObserver`], [`Notifier`] - User-facing status and log sinks

pub mod capability;
pub mod command;
pub mod error;
pub mod report;
pub mod state;
pub mod status;
pub mod store;

pub use capability::{
    BuildErrorSource, ConsoleErrorFeed, ConsoleErrorWatch, NoticeLevel, Notifier,
    PreviewDocument, ReportChannel, ScreenshotCapturer, StatusObserver,
};
pub use command::{ActionCommand, ActionName, Command, UpdateCommand};
pub use error::{HostError, StorageError, UpstreamError, UpstreamErrorKind};
pub use report::{Report, ReportStatus};
pub use state::{AUTOMATION_KEY, ConversationState, MessageRecord, PersistedRecord};
pub use status::{TagEntry, TagState};
pub use store::ContextStore;
