use serde::Deserialize;

/// Stage tag the backend uses for the final event of a successful run.
pub const COMPLETE_STAGE: &str = "complete";

/// One decoded progress event from the wire.
///
/// Every field is optional: the backend emits whatever subset applies to the
/// current pipeline phase, and unknown keys are ignored so the protocol can
/// grow without breaking older clients.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StreamEvent {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StreamEvent {
    /// True when this event ends the stream: an application error, or the
    /// completion stage carrying its result payload. At most one terminal
    /// event is honored per session; the dispatcher ignores anything after it.
    pub fn is_terminal(&self) -> bool {
        self.error.is_some()
            || (self.stage.as_deref() == Some(COMPLETE_STAGE) && self.data.is_some())
    }
}
