//! Extraction of text deltas from chat completion chunks

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Pull `choices[0].delta.content` out of a `data:` payload.
///
/// Returns `Err` only when the payload is not complete JSON. Valid JSON of any
/// other shape (role-only deltas, finish reasons, usage frames) is `Ok(None)`,
/// as is an empty content string.
pub fn extract_delta(payload: &str) -> serde_json::Result<Option<String>> {
    let value: serde_json::Value = serde_json::from_str(payload)?;

    let chunk = match StreamChunk::deserialize(value) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!("Ignoring payload with unexpected shape: {}", e);
            return Ok(None);
        }
    };

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_delta() {
        let delta = extract_delta(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).unwrap();
        assert_eq!(delta.as_deref(), Some("Hel"));
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let payload = r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1,
            "model":"google/gemini-2.5-flash",
            "choices":[{"index":0,"delta":{"role":"assistant","content":"ok"},"logprobs":null}]}"#;
        assert_eq!(extract_delta(payload).unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_role_only_delta_is_noop() {
        let delta = extract_delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(delta, None);
    }

    #[test]
    fn test_finish_reason_only_is_noop() {
        let delta =
            extract_delta(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(delta, None);
    }

    #[test]
    fn test_null_and_empty_content_are_noop() {
        assert_eq!(
            extract_delta(r#"{"choices":[{"delta":{"content":null}}]}"#).unwrap(),
            None
        );
        assert_eq!(
            extract_delta(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_other_shapes_are_noop() {
        assert_eq!(extract_delta(r#"{"usage":{"prompt_tokens":3}}"#).unwrap(), None);
        assert_eq!(extract_delta(r#"{"choices":[]}"#).unwrap(), None);
        assert_eq!(extract_delta(r#"{"choices":"nope"}"#).unwrap(), None);
        assert_eq!(extract_delta("[1,2,3]").unwrap(), None);
    }

    #[test]
    fn test_truncated_json_is_error() {
        assert!(extract_delta(r#"{"choices":[{"delta":{"content":"Hi""#).is_err());
    }
}
