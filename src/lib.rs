pub mod api;
pub mod config;
pub mod runner;
pub mod session;
pub mod sse;
pub mod types;
pub mod util;

#[cfg(test)]
pub mod test_support;

pub use api::client::{ByteStream, OperationRequest, StreamClient};
pub use config::Config;
pub use runner::{consume_stream, consume_stream_with_parser, RunControl, StreamRunner};
pub use session::{SessionPhase, SessionUpdate, StreamSession};
pub use types::StreamEvent;
