//! Classification of decoded SSE lines

/// Prefix of lines carrying an event payload
pub const DATA_PREFIX: &str = "data: ";

/// Payload marking the end of the event stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// What a single decoded line means to the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Empty or whitespace-only: heartbeat or event separator
    Blank,
    /// `:` comment
    Comment,
    /// A field this client does not handle (`event:`, `id:`, `retry:`, ...)
    Other,
    /// The terminal sentinel
    Done,
    /// Trimmed payload of a `data: ` line
    Data(&'a str),
}

impl SseLine<'_> {
    /// Classify one line (already stripped of its line terminator)
    pub fn classify(line: &str) -> SseLine<'_> {
        if line.trim().is_empty() {
            return SseLine::Blank;
        }
        if line.starts_with(':') {
            return SseLine::Comment;
        }
        match line.strip_prefix(DATA_PREFIX) {
            Some(payload) => {
                let payload = payload.trim();
                if payload == DONE_SENTINEL {
                    SseLine::Done
                } else {
                    SseLine::Data(payload)
                }
            }
            None => SseLine::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines() {
        assert_eq!(SseLine::classify(""), SseLine::Blank);
        assert_eq!(SseLine::classify("   \t"), SseLine::Blank);
    }

    #[test]
    fn test_comments() {
        assert_eq!(SseLine::classify(": keep-alive"), SseLine::Comment);
        assert_eq!(SseLine::classify(":"), SseLine::Comment);
    }

    #[test]
    fn test_unhandled_fields() {
        assert_eq!(SseLine::classify("event: message"), SseLine::Other);
        assert_eq!(SseLine::classify("id: 7"), SseLine::Other);
        // Missing the space after the colon is not a data line here
        assert_eq!(SseLine::classify("data:{}"), SseLine::Other);
    }

    #[test]
    fn test_data_payload_is_trimmed() {
        assert_eq!(
            SseLine::classify("data:   {\"a\":1}  "),
            SseLine::Data("{\"a\":1}")
        );
    }

    #[test]
    fn test_done_sentinel() {
        assert_eq!(SseLine::classify("data: [DONE]"), SseLine::Done);
        assert_eq!(SseLine::classify("data: [DONE] "), SseLine::Done);
    }
}
