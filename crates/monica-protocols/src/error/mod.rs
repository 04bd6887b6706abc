//! Error types for the Monica protocol layer.

mod host;
mod storage;
mod upstream;

pub use host::*;
pub use storage::*;
pub use upstream::*;
