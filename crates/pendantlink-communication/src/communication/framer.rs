//! Line framing for the peer's ASCII control channel
//!
//! Bytes are accumulated until `\n`; `\r` is dropped. Partial lines survive
//! between polling ticks, so a line may arrive split across any number of reads.

use crate::communication::serial::PortHandle;
use std::io;

/// Lines longer than this are discarded as line noise
pub const MAX_LINE_LEN: usize = 1024;

const READ_CHUNK: usize = 64;

/// Accumulates bytes into complete, trimmed lines
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: String,
    received: usize,
    discarding: bool,
}

impl LineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(64),
            received: 0,
            discarding: false,
        }
    }

    /// Feed one byte; returns a line when `byte` terminates one
    pub fn push_byte(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'\r' => None,
            b'\n' => {
                if std::mem::take(&mut self.discarding) {
                    return None;
                }
                let line = trim_line(&self.buffer).to_string();
                self.reset();
                Some(line)
            }
            _ if self.discarding => None,
            _ => {
                if self.received >= MAX_LINE_LEN {
                    tracing::warn!("Discarding line longer than {} bytes", MAX_LINE_LEN);
                    self.reset();
                    self.discarding = true;
                    return None;
                }
                self.buffer.push(byte as char);
                self.received += 1;
                None
            }
        }
    }

    /// Feed a chunk of bytes and collect every completed line
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// Drain everything the port currently has without blocking
    ///
    /// A no-op when no bytes are available. Stops early on end of stream.
    pub fn drain(&mut self, port: &mut dyn PortHandle) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let available = port.bytes_to_read()?;
            if available == 0 {
                break;
            }

            let want = available.min(chunk.len());
            let read = port.read(&mut chunk[..want])?;
            if read == 0 {
                break;
            }

            lines.extend(self.push(&chunk[..read]));
        }

        Ok(lines)
    }

    /// Characters of the line currently being received
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Check if no partial line is buffered or being discarded
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && !self.discarding
    }

    /// Check if the current line overflowed and is being skipped
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Discard any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.received = 0;
        self.discarding = false;
    }
}

/// Trim ASCII control characters and spaces from both ends
pub fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c <= ' ')
}
