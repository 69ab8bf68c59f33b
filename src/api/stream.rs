use super::decode::{decode_line, Event};

/// Splits an arbitrarily chunked byte stream into complete lines and decodes
/// each one.
///
/// Bytes are buffered raw so a multi-byte UTF-8 sequence split across two
/// chunks is only decoded once the whole line is present.
#[derive(Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<Event> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|byte| *byte == b'\n') {
            let line_end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..line_end]);
            if let Some(event) = decode_line(&line) {
                events.push(event);
            }
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        events
    }

    /// Decode whatever is left after the stream closed without a final `\n`.
    pub fn flush(&mut self) -> Option<Event> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
