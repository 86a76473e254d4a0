//! Incremental line splitter for SSE response bodies.
//!
//! Chunks may end anywhere, including inside a multi-byte UTF-8 sequence;
//! bytes are buffered until a full `\n`-terminated line is available.

/// Accumulates raw body chunks and yields complete lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed, without the
    /// trailing `\r\n` / `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(nl) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=nl).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        lines
    }

    /// Take the unterminated trailing line, if any. Used once the body ends.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string())
    }

    /// Bytes of an incomplete trailing line still held back.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Extract the payload of an SSE `data:` line. Other fields (`event:`,
/// comments, blank separators) yield `None`.
#[must_use]
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
}
