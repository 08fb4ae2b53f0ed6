use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_LOG_PATH: &str = "/tmp/stagefeed-warnings.log";
const LOG_PATH_ENV: &str = "STAGEFEED_LOG_PATH";

/// Sink for soft failures inside the frame parser. Malformed data lines are
/// reported here and skipped; they never abort consumption, so the only trace
/// of one is whatever the sink records.
pub trait WarningSink: Send {
    fn frame_parse_warning(&self, line: &str, error: &serde_json::Error);
}

/// Default sink: append to the env-selected log file, falling back to stderr.
#[derive(Default)]
pub struct LogFileSink;

impl WarningSink for LogFileSink {
    fn frame_parse_warning(&self, line: &str, error: &serde_json::Error) {
        emit_frame_parse_warning(line, error);
    }
}

pub fn emit_frame_parse_warning(line: &str, error: &serde_json::Error) {
    let message = format!("STAGEFEED WARN frame_parse_failed error={error}\nline:\n{line}\n");
    emit_log_message(&message);
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
