//! Streaming module
//!
//! NDJSON line buffering and the lazy stream handed to callers.

pub mod parser;
pub mod stream;

// Re-export commonly used types
pub use parser::{decode_line, LineBuffer};
pub use stream::{CancelHandle, NdjsonStream};
