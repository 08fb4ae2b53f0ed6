use crate::config::Config;
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;
use std::time::Duration;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Body of the request that starts a streamed operation: the operation name
/// plus whatever phase-specific parameters the caller collected.
#[derive(Debug, Clone, Serialize)]
pub struct OperationRequest {
    pub operation: String,
    pub params: Value,
}

impl OperationRequest {
    pub fn new(operation: impl Into<String>, params: Value) -> Self {
        Self {
            operation: operation.into(),
            params,
        }
    }
}

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, request: &OperationRequest) -> Result<ByteStream>;
}

/// Issues the initial HTTP request for a streamed operation and hands back
/// the raw byte stream. Everything after the response headers is the
/// decoder's problem.
#[derive(Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl StreamClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            #[cfg(test)]
            mock_stream_producer: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: "http://localhost:8000/api/stream".to_string(),
            api_key: None,
            mock_stream_producer: Some(mock_producer),
        }
    }

    pub async fn create_stream(&self, request: &OperationRequest) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(request);
            }
        }

        let mut http_request = self
            .http
            .post(&self.api_url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .json(request);

        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("authorization", format!("Bearer {api_key}"));
        }

        let request_url = self.api_url.clone();
        let response = http_request
            .send()
            .await
            .map_err(|error| map_stream_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_stream_request_error(error, &request_url))?;

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_stream_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }
}

fn map_stream_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local stream endpoint '{}': {}. Start your local backend or update STAGEFEED_API_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach stream endpoint '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("stream request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "stream endpoint '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        );
    }
    anyhow!("stream request to '{}' failed: {}", request_url, error)
}
