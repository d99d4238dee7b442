//! querylog-common — Shared error type and persistence format used across all querylog crates.

pub mod error;
pub mod format;

pub use error::{QueryLogError, Result};
pub use format::LogFormat;
