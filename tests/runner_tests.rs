use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::json;
use stagefeed::api::logging::WarningSink;
use stagefeed::session::stages::StagePlan;
use stagefeed::sse::FrameParser;
use stagefeed::{
    consume_stream, consume_stream_with_parser, ByteStream, RunControl, SessionPhase,
    SessionUpdate, StreamSession,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

fn byte_stream(chunks: Vec<&str>) -> ByteStream {
    let items: Vec<anyhow::Result<Bytes>> = chunks
        .into_iter()
        .map(|s| Ok(Bytes::from(s.to_string())))
        .collect();
    Box::pin(stream::iter(items))
}

fn observed_session(stages: &[&str]) -> (StreamSession, mpsc::UnboundedReceiver<SessionUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = StreamSession::new(StagePlan::new(stages.iter().copied()), Some(tx));
    (session, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SessionUpdate>) -> Vec<SessionUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

// An event split across two chunks, then completion: both must be dispatched
// as if the stream had arrived in one piece.
#[tokio::test]
async fn test_event_split_across_chunks_dispatches_both_events() {
    let (mut session, mut rx) = observed_session(&["a"]);
    let stream = byte_stream(vec![
        "data: {\"stage\":\"a\",\"progress\":10}\nda",
        "ta: {\"stage\":\"complete\",\"data\":{\"x\":1}}\n",
    ]);

    consume_stream(stream, &mut session, &RunControl::new())
        .await
        .expect("consumption succeeds");

    assert_eq!(session.phase(), SessionPhase::Complete);
    assert_eq!(session.progress(), 100.0);
    assert_eq!(session.completion_data(), Some(&json!({"x": 1})));

    let updates = drain(&mut rx);
    assert_eq!(
        updates,
        vec![
            SessionUpdate::Progress { percent: 10.0 },
            SessionUpdate::StageStarted {
                stage: "a".to_string()
            },
            SessionUpdate::StepCompleted {
                stage: "a".to_string()
            },
            SessionUpdate::Progress { percent: 100.0 },
            SessionUpdate::Completed { data: json!({"x": 1}) },
        ]
    );
}

// A lone keep-alive on a still-open stream dispatches nothing and leaves the
// session streaming.
#[tokio::test(start_paused = true)]
async fn test_keepalive_only_keeps_session_streaming() {
    let (mut session, mut rx) = observed_session(&[]);
    let stream: ByteStream = Box::pin(
        stream::iter(vec![anyhow::Ok(Bytes::from(": keepalive\n"))]).chain(stream::pending()),
    );
    let control = RunControl::new();

    {
        let mut fut = Box::pin(consume_stream(stream, &mut session, &control));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), fut.as_mut())
                .await
                .is_err(),
            "open stream must keep the consumer waiting"
        );
    }

    assert!(drain(&mut rx).is_empty());
    assert_eq!(session.phase(), SessionPhase::Streaming);
}

// Malformed JSON is isolated: one warning, then the valid completion lands.
#[tokio::test]
async fn test_bad_json_line_is_skipped_and_completion_still_lands() {
    #[derive(Clone, Default)]
    struct CountingSink {
        count: Arc<Mutex<usize>>,
    }
    impl WarningSink for CountingSink {
        fn frame_parse_warning(&self, _line: &str, _error: &serde_json::Error) {
            *self.count.lock().unwrap() += 1;
        }
    }

    let sink = CountingSink::default();
    let count = sink.count.clone();
    let (mut session, mut rx) = observed_session(&[]);
    let stream = byte_stream(vec![
        "data: {bad json\n",
        "data: {\"stage\":\"complete\",\"data\":{}}\n",
    ]);

    consume_stream_with_parser(
        stream,
        &mut session,
        &RunControl::new(),
        FrameParser::with_sink(Box::new(sink)),
    )
    .await
    .expect("malformed line must not abort consumption");

    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(session.phase(), SessionPhase::Complete);
    let completions = drain(&mut rx)
        .into_iter()
        .filter(|u| matches!(u, SessionUpdate::Completed { .. }))
        .count();
    assert_eq!(completions, 1);
}

// Chunks queued behind a terminal event are never dispatched.
#[tokio::test]
async fn test_no_dispatch_after_terminal_event() {
    let (mut session, mut rx) = observed_session(&[]);
    let stream = byte_stream(vec![
        "data: {\"error\":\"backend failure\"}\n",
        "data: {\"progress\":90}\n",
    ]);

    consume_stream(stream, &mut session, &RunControl::new())
        .await
        .expect("application errors are recorded, not returned");

    assert_eq!(session.phase(), SessionPhase::Error);
    assert_eq!(session.progress(), 0.0);
    assert_eq!(
        drain(&mut rx),
        vec![SessionUpdate::Failed {
            error: "backend failure".to_string()
        }]
    );
}

#[tokio::test]
async fn test_cancellation_prevents_dispatch_of_buffered_chunks() {
    let (mut session, mut rx) = observed_session(&[]);
    let control = RunControl::new();
    control.cancel();
    let stream = byte_stream(vec!["data: {\"progress\":10}\n"]);

    consume_stream(stream, &mut session, &control)
        .await
        .expect("cancellation is a clean exit");

    assert_eq!(session.phase(), SessionPhase::Cancelled);
    assert_eq!(drain(&mut rx), vec![SessionUpdate::Cancelled]);
}
