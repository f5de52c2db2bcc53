//! Error types for chatify-agent

use thiserror::Error;

/// Result type alias using chatify-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the completions layer
    #[error(transparent)]
    Ai(#[from] chatify_ai::Error),

    /// A send was requested while another one is still running
    #[error("A message is already being sent")]
    Busy,

    /// Input was empty or whitespace only
    #[error("Nothing to send")]
    EmptyInput,

    /// The operation needs a conversation store and a signed-in user
    #[error("Conversation history is not available without a user")]
    NoPersistence,

    /// Unknown conversation id
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// A conversation store failed (string-based so stores can wrap anything)
    #[error("Store error: {0}")]
    Store(String),
}
