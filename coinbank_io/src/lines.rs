//! Newline framing for byte streams that may split a line across reads.

/// Longest line kept while waiting for a newline; longer runs are discarded.
pub const MAX_LINE_BYTES: usize = 4096;

#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_LINE_BYTES && !self.buf.contains(&b'\n') {
            tracing::warn!(len = self.buf.len(), "no newline in sensor input, discarding");
            self.buf.clear();
        }
    }

    /// Next complete line with surrounding whitespace trimmed.
    ///
    /// Bytes that are not valid UTF-8 are dropped rather than replaced.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.buf.drain(..=pos).collect();
        let text: String = String::from_utf8_lossy(&raw)
            .chars()
            .filter(|&c| c != char::REPLACEMENT_CHARACTER)
            .collect();
        Some(text.trim().to_string())
    }

    /// Bytes waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
