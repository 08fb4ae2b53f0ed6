use crate::api::logging::{LogFileSink, WarningSink};
use crate::types::StreamEvent;

const DATA_PREFIX: &str = "data:";

/// Classifies one complete line and, for data frames, decodes the JSON
/// payload into a [`StreamEvent`].
///
/// Comment lines (leading colon) are keep-alives: they never produce events
/// but are counted so a consumer can observe liveness. Malformed JSON in a
/// data frame is reported to the warning sink and skipped; the failure is
/// isolated to that single line.
pub struct FrameParser {
    sink: Box<dyn WarningSink>,
    comment_frames: u64,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self::with_sink(Box::new(LogFileSink))
    }

    pub fn with_sink(sink: Box<dyn WarningSink>) -> Self {
        Self {
            sink,
            comment_frames: 0,
        }
    }

    /// Number of keep-alive comment lines seen so far.
    pub fn comment_frames(&self) -> u64 {
        self.comment_frames
    }

    pub fn parse_line(&mut self, line: &str) -> Option<StreamEvent> {
        if line.is_empty() {
            return None;
        }

        if line.starts_with(':') {
            self.comment_frames += 1;
            return None;
        }

        let rest = line.strip_prefix(DATA_PREFIX)?;
        let payload = rest.strip_prefix(' ').unwrap_or(rest);

        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => Some(event),
            Err(err) => {
                self.sink.frame_parse_warning(line, &err);
                None
            }
        }
    }
}
