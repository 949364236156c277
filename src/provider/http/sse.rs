//! Incremental line splitting for `data:`-framed event streams.
//!
//! The transport hands us chunks with arbitrary boundaries. Bytes are buffered
//! until a `\n` arrives, so a frame (or a multi-byte UTF-8 character) split
//! across reads decodes the same as one delivered whole.

/// Prefix marking a data-bearing frame.
pub const DATA_PREFIX: &str = "data:";
/// Payload that terminates the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A classified protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `data: [DONE]`
    Done,
    /// `data: <payload>`, payload trimmed.
    Data(String),
}

impl Frame {
    /// Classify one complete line.
    ///
    /// Blank lines are frame separators and other frame types (`event:`,
    /// `id:`, `: comment`) are unused by this protocol; both yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload == DONE_SENTINEL {
            Some(Self::Done)
        } else {
            Some(Self::Data(payload.to_string()))
        }
    }
}

/// Buffers bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no `\n`.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes, without the terminator.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();

        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            lines.push(String::from_utf8_lossy(&self.buffer[start..end]).into_owned());
            start = end + 1;
            from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        lines
    }

    /// Check if an unterminated line is buffered.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drop the unterminated trailing line. Returns how many bytes were discarded.
    pub fn discard_pending(&mut self) -> usize {
        let len = self.buffer.len();
        self.buffer.clear();
        self.scanned = 0;
        len
    }
}
