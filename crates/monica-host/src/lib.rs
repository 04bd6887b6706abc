//! # Monica Host
//!
//! Native messaging host for the Monica bridge extension. The extension sends
//! length-prefixed JSON requests over stdio; the host answers each one from a
//! [`ContextStore`](monica_protocols::ContextStore).

pub mod framing;
pub mod messages;
pub mod router;

pub use framing::{FramingError, MAX_OUTGOING_BYTES, read_message, serve, write_message};
pub use messages::{HostRequest, HostResponse, ResponseStatus};
pub use monica_protocols::AUTOMATION_KEY;
pub use router::{HostRouter, TabController};
