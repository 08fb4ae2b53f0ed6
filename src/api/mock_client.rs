use crate::api::client::{ByteStream, MockStreamProducer, OperationRequest};
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Test double that plays back scripted chunk sequences, one sequence per
/// `create_stream` call. Chunks are passed through byte-for-byte so tests can
/// split lines (or multi-byte characters) anywhere they like.
#[derive(Clone)]
pub struct MockStreamClient {
    responses: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockStreamClient {
    pub fn new(responses: Vec<Vec<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
        }
    }
}

impl MockStreamProducer for MockStreamClient {
    fn create_mock_stream(&self, _request: &OperationRequest) -> Result<ByteStream> {
        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow::anyhow!(
                "MockStreamClient: No more responses configured"
            ));
        }
        let chunks = responses_guard.remove(0);

        let byte_chunks: Vec<Result<Bytes>> =
            chunks.into_iter().map(|s| Ok(Bytes::from(s))).collect();

        Ok(Box::pin(stream::iter(byte_chunks)))
    }
}
