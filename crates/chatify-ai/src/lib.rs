//! chatify-ai: streaming chat completions over Server-Sent Events
//!
//! This crate owns everything between the socket and a sequence of text
//! deltas: the HTTP client, line framing, SSE classification and delta
//! extraction.

pub mod client;
pub mod decoder;
pub mod delta;
pub mod error;
pub mod sse;
pub mod stream;
pub mod types;

pub use client::{ByteStream, CompletionsClient};
pub use error::{Error, Result};
pub use stream::StreamParser;
pub use types::*;
