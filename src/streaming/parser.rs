//! Incremental NDJSON line buffer
//!
//! Accumulates raw body chunks and hands out complete lines. Between
//! processing passes the buffer holds at most one unterminated line.

use crate::errors::{ClientError, Result};
use serde::de::DeserializeOwned;

/// Line delimiter for NDJSON framing
pub const DELIMITER: u8 = b'\n';

/// Per-call byte accumulator
///
/// Consumed lines are not shifted out one by one: `start` marks the first
/// unread byte and `scanned` how far the delimiter search has got, and the
/// consumed prefix is dropped once per `push`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    start: usize,
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096), // Start with 4KB
            start: 0,
            scanned: 0,
        }
    }

    /// Append a chunk received from the transport
    pub fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buffer.extend_from_slice(bytes);
    }

    /// Take the next complete line, without its delimiter
    ///
    /// ```text
    /// B = "a\nb\nc"   next_line() -> "a"
    ///                 next_line() -> "b"
    ///                 next_line() -> None, "c" stays buffered
    /// ```
    pub fn next_line(&mut self) -> Option<&[u8]> {
        let unscanned = &self.buffer[self.scanned..];
        match unscanned.iter().position(|&b| b == DELIMITER) {
            Some(offset) => {
                let end = self.scanned + offset;
                let line_start = self.start;
                self.start = end + 1;
                self.scanned = self.start;
                Some(&self.buffer[line_start..end])
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Bytes of the current unterminated line
    #[cfg(test)]
    pub(crate) fn remainder(&self) -> &[u8] {
        &self.buffer[self.start..]
    }

    /// Unread bytes
    pub fn len(&self) -> usize {
        self.buffer.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.start = 0;
        self.scanned = 0;
    }
}

/// Decode one NDJSON line into the expected response type
pub fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Result<T> {
    serde_json::from_slice(line).map_err(ClientError::DecodeError)
}
