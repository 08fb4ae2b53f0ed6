use anyhow::{bail, Result};

/// Incremental newline-delimited text decoder.
///
/// Accepts raw byte chunks in arrival order and yields complete lines. Two
/// pieces of state survive across calls: a byte tail for a UTF-8 sequence cut
/// mid-character by a chunk boundary, and a text buffer for a line cut
/// mid-way. Chunk boundaries therefore never affect which lines come out.
#[derive(Default)]
pub struct LineDecoder {
    text: String,
    utf8_tail: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every line completed by it, in order, with the
    /// trailing newline (and any `\r` before it) stripped. An empty chunk
    /// yields no lines and leaves all buffered state untouched.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        if chunk.is_empty() {
            return Ok(Vec::new());
        }

        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        match std::str::from_utf8(&bytes) {
            Ok(text) => self.text.push_str(text),
            Err(err) if err.error_len().is_none() => {
                // Incomplete trailing sequence: decode the valid prefix and
                // carry the partial character into the next chunk.
                let (head, tail) = bytes.split_at(err.valid_up_to());
                self.text
                    .push_str(std::str::from_utf8(head).expect("prefix validated"));
                self.utf8_tail = tail.to_vec();
            }
            Err(err) => {
                bail!(
                    "stream chunk is not valid UTF-8 at byte {}",
                    err.valid_up_to()
                );
            }
        }

        let mut lines = Vec::new();
        while let Some(pos) = self.text.find('\n') {
            let mut line: String = self.text.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Drain the decoder at natural end of stream. A non-empty unterminated
    /// tail is flushed as a final line so a terminal event whose newline never
    /// arrived is still surfaced. A dangling partial UTF-8 character at this
    /// point means the stream was truncated mid-byte and is a decode error.
    pub fn finish(&mut self) -> Result<Option<String>> {
        if !self.utf8_tail.is_empty() {
            bail!(
                "stream ended inside a multi-byte character ({} byte(s) pending)",
                self.utf8_tail.len()
            );
        }
        if self.text.is_empty() {
            return Ok(None);
        }
        let mut line = std::mem::take(&mut self.text);
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}
