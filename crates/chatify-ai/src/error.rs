//! Error types for chatify-ai

use thiserror::Error;

/// Result type alias using chatify-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Shown when the server is rate limiting and did not explain why
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again in a moment.";
/// Shown when the account is out of credits and the server gave no message
pub const QUOTA_MESSAGE: &str = "Usage limit reached. Please add credits to continue.";
/// Fallback for every other failure
pub const GENERIC_MESSAGE: &str = "Failed to get AI response";

/// Errors that can occur when talking to the completion endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP 429
    #[error("Rate limited: {}", message.as_deref().unwrap_or("no details"))]
    RateLimited { message: Option<String> },

    /// HTTP 402
    #[error("Quota exhausted: {}", message.as_deref().unwrap_or("no details"))]
    QuotaExceeded { message: Option<String> },

    /// Any other non-success status
    #[error("API error (status {status}): {}", message.as_deref().unwrap_or("no details"))]
    Api { status: u16, message: Option<String> },

    /// Success status but nothing to read
    #[error("Response has no body")]
    MissingBody,

    /// Stream was aborted
    #[error("Request aborted")]
    Aborted,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error body returned by the chat endpoint: `{ "error": "..." }`
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl Error {
    /// Build the error for a non-success status from the raw response body
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());

        match status {
            429 => Error::RateLimited { message },
            402 => Error::QuotaExceeded { message },
            _ => Error::Api { status, message },
        }
    }

    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Error::RateLimited { message } => {
                message.clone().unwrap_or_else(|| RATE_LIMIT_MESSAGE.to_string())
            }
            Error::QuotaExceeded { message } => {
                message.clone().unwrap_or_else(|| QUOTA_MESSAGE.to_string())
            }
            Error::Api {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_MESSAGE.to_string(),
        }
    }

    /// Whether the request was cancelled rather than failed
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_default_message() {
        let e = Error::from_status(429, "");
        assert!(matches!(e, Error::RateLimited { message: None }));
        assert_eq!(e.user_message(), RATE_LIMIT_MESSAGE);
    }

    #[test]
    fn test_quota_default_message() {
        let e = Error::from_status(402, "not json");
        assert_eq!(e.user_message(), QUOTA_MESSAGE);
    }

    #[test]
    fn test_server_message_wins() {
        let e = Error::from_status(429, r#"{"error":"Slow down"}"#);
        assert_eq!(e.user_message(), "Slow down");

        let e = Error::from_status(500, r#"{"error":"LOVABLE_API_KEY is not configured"}"#);
        assert_eq!(e.user_message(), "LOVABLE_API_KEY is not configured");
    }

    #[test]
    fn test_other_status_without_body_is_generic() {
        let e = Error::from_status(503, "<html>bad gateway</html>");
        assert!(matches!(e, Error::Api { status: 503, message: None }));
        assert_eq!(e.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_blank_error_field_is_ignored() {
        let e = Error::from_status(500, r#"{"error":"  "}"#);
        assert_eq!(e.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_non_status_errors_are_generic() {
        assert_eq!(Error::MissingBody.user_message(), GENERIC_MESSAGE);
        assert_eq!(Error::Aborted.user_message(), GENERIC_MESSAGE);
        assert_eq!(
            Error::InvalidConfig("no endpoint".into()).user_message(),
            GENERIC_MESSAGE
        );
        assert!(Error::Aborted.is_aborted());
        assert!(!Error::MissingBody.is_aborted());
    }
}
