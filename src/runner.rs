use crate::api::client::{ByteStream, OperationRequest, StreamClient};
use crate::session::StreamSession;
use crate::sse::{FrameParser, LineDecoder};
use anyhow::Result;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Yield back to the runtime after this many chunks so a long-running stream
/// cannot starve other tasks. Fairness only, not correctness.
const YIELD_EVERY: usize = 16;

/// Handle for stopping or suspending one consumption loop from outside it.
///
/// Cancellation is cooperative: it is observed at loop boundaries, so a read
/// already in flight finishes but nothing from it (or after it) is
/// dispatched. Pause is an explicit gate awaited before each read, not a
/// sleep poll; cancellation always wins over a paused gate.
#[derive(Clone)]
pub struct RunControl {
    token: CancellationToken,
    pause_tx: watch::Sender<bool>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (pause_tx, _) = watch::channel(false);
        Self {
            token: CancellationToken::new(),
            pause_tx,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn pause(&self) {
        self.pause_tx.send_replace(true);
    }

    pub fn resume(&self) {
        self.pause_tx.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.pause_tx.borrow()
    }

    async fn wait_until_resumed(&self) {
        let mut pause_rx = self.pause_tx.subscribe();
        while *pause_rx.borrow_and_update() {
            if pause_rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Drive one byte stream to a terminal session state.
///
/// Lines are decoded and dispatched strictly in arrival order. A terminal
/// event stops reading immediately; buffered chunks after it are dropped.
/// Transport and decode failures mark the session failed and propagate; an
/// application error event or cancellation is a normal `Ok` return since the
/// session itself records the outcome.
pub async fn consume_stream(
    stream: ByteStream,
    session: &mut StreamSession,
    control: &RunControl,
) -> Result<()> {
    consume_stream_with_parser(stream, session, control, FrameParser::new()).await
}

/// Variant of [`consume_stream`] taking a caller-built parser, usually for a
/// custom warning sink.
pub async fn consume_stream_with_parser(
    mut stream: ByteStream,
    session: &mut StreamSession,
    control: &RunControl,
    mut parser: FrameParser,
) -> Result<()> {
    session.begin_request();
    session.begin_streaming();

    let mut decoder = LineDecoder::new();
    let mut iterations = 0usize;

    loop {
        if control.is_cancelled() {
            session.mark_cancelled();
            return Ok(());
        }

        tokio::select! {
            _ = control.cancelled() => {
                session.mark_cancelled();
                return Ok(());
            }
            _ = control.wait_until_resumed() => {}
        }

        let next = tokio::select! {
            biased;
            _ = control.cancelled() => {
                session.mark_cancelled();
                return Ok(());
            }
            next = stream.next() => next,
        };

        let Some(chunk_result) = next else {
            break;
        };
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(err) => {
                session.fail(err.to_string());
                return Err(err);
            }
        };

        let lines = match decoder.push(&chunk) {
            Ok(lines) => lines,
            Err(err) => {
                session.fail(err.to_string());
                return Err(err);
            }
        };

        for line in lines {
            if let Some(event) = parser.parse_line(&line) {
                session.dispatch(event);
                if !session.is_active() {
                    return Ok(());
                }
            }
        }

        iterations += 1;
        if iterations % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
    }

    // Natural end of stream: an unterminated trailing line is still parsed so
    // a final event missing its newline is not lost.
    match decoder.finish() {
        Ok(Some(line)) => {
            if let Some(event) = parser.parse_line(&line) {
                session.dispatch(event);
            }
        }
        Ok(None) => {}
        Err(err) => {
            session.fail(err.to_string());
            return Err(err);
        }
    }

    if session.is_active() {
        session.fail("stream ended before a terminal event".to_string());
    }
    Ok(())
}

/// Starts streamed operations and enforces one active consumer at a time.
pub struct StreamRunner {
    client: StreamClient,
    control: RunControl,
}

impl StreamRunner {
    pub fn new(client: StreamClient) -> Self {
        Self {
            client,
            control: RunControl::new(),
        }
    }

    /// Cancel whatever run is active and mint the control handle for the next
    /// one. The prior loop observes its cancelled token before the new
    /// session dispatches anything, so two consumers never race on UI state.
    pub fn begin(&mut self) -> RunControl {
        self.control.cancel();
        self.control = RunControl::new();
        self.control.clone()
    }

    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub async fn run(
        &self,
        request: &OperationRequest,
        session: &mut StreamSession,
        control: &RunControl,
    ) -> Result<()> {
        session.begin_request();
        if control.is_cancelled() {
            session.mark_cancelled();
            return Ok(());
        }

        let stream = match self.client.create_stream(request).await {
            Ok(stream) => stream,
            Err(err) => {
                session.fail(err.to_string());
                return Err(err);
            }
        };

        consume_stream(stream, session, control).await
    }
}
