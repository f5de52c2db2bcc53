//! HTTP client for the streaming chat completions endpoint

use std::{pin::Pin, time::Duration};

use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio_stream::Stream;

use crate::{
    error::{Error, Result},
    types::{CompletionRequest, Message},
};

/// Raw response body chunks, in arrival order
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Client for a chat endpoint that answers with `text/event-stream`
#[derive(Debug, Clone)]
pub struct CompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl CompletionsClient {
    /// Create a client posting to `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
            model: None,
        }
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Include a `model` field in the request body
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Apply a total request timeout, covering the whole streamed body
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the transcript and return the response body as a byte stream.
    ///
    /// Non-success statuses are turned into typed errors using the JSON
    /// `error` field of the body when there is one.
    pub async fn stream(&self, messages: &[Message]) -> Result<ByteStream> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::InvalidConfig("no chat endpoint configured".into()));
        }

        let body = CompletionRequest {
            messages,
            stream: true,
            model: self.model.as_deref(),
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(
            "Opening completion stream to {} with {} messages",
            self.endpoint,
            messages.len()
        );
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Completion request failed with {}: {}", status, text);
            return Err(Error::from_status(status.as_u16(), &text));
        }

        if response.content_length() == Some(0) {
            return Err(Error::MissingBody);
        }

        tracing::debug!("Completion stream open ({})", status);
        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(Error::from)),
        ))
    }
}
