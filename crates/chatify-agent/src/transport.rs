//! Transport abstraction for opening a completion stream

use async_trait::async_trait;
use chatify_ai::{ByteStream, CompletionsClient, Message, Result};

/// Opens the response body for a transcript
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the full transcript and return the raw response chunks
    async fn open(&self, messages: &[Message]) -> Result<ByteStream>;
}

/// HTTP transport backed by [`CompletionsClient`]
pub struct HttpTransport {
    client: CompletionsClient,
}

impl HttpTransport {
    pub fn new(client: CompletionsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, messages: &[Message]) -> Result<ByteStream> {
        self.client.stream(messages).await
    }
}
