//! Line framing over a chunked byte stream
//!
//! Chunks arrive with arbitrary boundaries: a line, or even a single UTF-8
//! character, may be split across two reads. [`FrameDecoder`] keeps the
//! undecoded tail bytes and the unterminated tail text between calls and
//! hands out complete lines only.

/// Substituted for byte sequences that can never be valid UTF-8
const REPLACEMENT: char = '\u{FFFD}';

/// Incremental UTF-8 decoder and newline splitter
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Leading bytes of a character whose remaining bytes have not arrived yet
    pending: Vec<u8>,
    /// Decoded text not yet terminated by `\n`
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk and append it to the line buffer
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let input = std::mem::take(&mut self.pending);
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Take the next complete line, without its `\n` and one trailing `\r`
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.find('\n')?;
        let mut line: String = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Put a consumed line back at the front of the buffer, newline included
    pub fn push_back(&mut self, line: &str) {
        self.buffer.insert(0, '\n');
        self.buffer.insert_str(0, line);
    }

    /// Drain everything left at end of stream.
    ///
    /// Held-back bytes are decoded lossily and the remaining text is split on
    /// `\n`; the last fragment counts as a line even without a terminator.
    pub fn finish(&mut self) -> Vec<String> {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        let rest = std::mem::take(&mut self.buffer);
        if rest.is_empty() {
            return Vec::new();
        }

        rest.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect()
    }

    /// Text waiting for a newline
    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}
