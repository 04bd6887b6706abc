//! # Monica Core
//!
//! Command extraction, state merging and action dispatch for the Monica
//! bridge, tied together by [`BridgeSession`].
//!
//! ## Flow
//!
//! ```text
//! AI output ──► extract_commands ──► Action ──► ActionDispatcher ──► Report ──► ReportChannel
//!                                 ├► Update ──► merge_into ──► ContextStore
//!                                 └► Changelog ──────────────► ContextStore
//!
//! preview errors ──► AutoFixer (automation on, outside cooldown) ──► ReportChannel
//! ```

pub mod autofix;
pub mod dispatcher;
pub mod extractor;
pub mod merge;
pub mod notice;
pub mod project;
pub mod prompt;
pub mod session;
pub mod tags;

pub use autofix::{AutoFixer, PreviewError};
pub use dispatcher::{ActionDispatcher, ActionPlan, Capabilities, DispatchSettings, Interaction, NO_CONSOLE_ERRORS};
pub use extractor::{Commands, extract_commands};
pub use merge::{MAX_MERGE_DEPTH, MergeError, deep_merge, merge_into};
pub use notice::TracingNotifier;
pub use project::ProjectId;
pub use prompt::rehydrate_prompt;
pub use session::{BridgeSession, IngestOutcome, NO_PROJECT_NOTICE};
pub use tags::TagStatusBoard;
