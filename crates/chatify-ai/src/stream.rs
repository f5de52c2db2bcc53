//! Reassembly of text deltas from a chunked SSE response

use tracing::{debug, warn};

use crate::{decoder::FrameDecoder, delta::extract_delta, sse::SseLine};

/// Turns raw response chunks into text deltas.
///
/// Feed every chunk to [`push`](Self::push) in arrival order and call
/// [`finish`](Self::finish) once the transport reports end of stream. Deltas
/// come out in the order they appear on the wire.
#[derive(Debug, Default)]
pub struct StreamParser {
    decoder: FrameDecoder,
    done: bool,
    /// A complete line whose payload failed to parse and was pushed back
    retried: Option<String>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Decode one chunk and return the deltas it completes.
    ///
    /// A payload that is not yet valid JSON is pushed back with its newline
    /// and extraction stops until the next chunk. If the same line still fails
    /// on that retry it is dropped so one bad frame cannot stall the stream.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.done {
            return deltas;
        }

        self.decoder.push(chunk);

        while let Some(line) = self.decoder.next_line() {
            let parsed = match SseLine::classify(&line) {
                SseLine::Blank | SseLine::Comment | SseLine::Other => continue,
                SseLine::Done => {
                    debug!("Stream reached [DONE]");
                    self.done = true;
                    break;
                }
                SseLine::Data(payload) => extract_delta(payload),
            };

            match parsed {
                Ok(delta) => {
                    self.retried = None;
                    deltas.extend(delta);
                }
                Err(e) => {
                    if self.retried.as_deref() == Some(line.as_str()) {
                        warn!("Dropping unparsable SSE payload after retry: {}", e);
                        self.retried = None;
                        continue;
                    }
                    debug!("Re-buffering incomplete SSE payload: {}", e);
                    self.decoder.push_back(&line);
                    self.retried = Some(line);
                    break;
                }
            }
        }

        deltas
    }

    /// Process whatever is left once reading has stopped.
    ///
    /// Runs after end of stream and after a live `[DONE]` alike. Every
    /// leftover fragment is treated as a line, including one without a
    /// trailing newline. `[DONE]` here only skips its own line and unparsable
    /// leftovers are ignored.
    pub fn finish(&mut self) -> Vec<String> {
        let leftover = self.decoder.finish();
        let mut deltas = Vec::new();
        for line in leftover {
            if let SseLine::Data(payload) = SseLine::classify(&line) {
                match extract_delta(payload) {
                    Ok(delta) => deltas.extend(delta),
                    Err(e) => debug!("Ignoring unparsable trailing payload: {}", e),
                }
            }
        }
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(chunks: &[&[u8]]) -> String {
        let mut parser = StreamParser::new();
        let mut text = String::new();
        for chunk in chunks {
            for delta in parser.push(chunk) {
                text.push_str(&delta);
            }
        }
        for delta in parser.finish() {
            text.push_str(&delta);
        }
        text
    }

    const REFERENCE: &str = concat!(
        ": OPENROUTER PROCESSING\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Grüße \"}}]}\r\n",
        "\r\n",
        "event: ping\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"aus \u{1F30D}\"}}]}\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n",
        "\n",
        "data: [DONE]\n",
        "\n",
    );

    #[test]
    fn test_two_chunk_example() {
        let text = collect(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
        ]);
        assert_eq!(text, "Hello");
    }

    #[test]
    fn test_json_split_mid_object() {
        let text = collect(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"",
            b"}}]}\n\n",
        ]);
        assert_eq!(text, "Hi");
    }

    #[test]
    fn test_single_chunk_reference() {
        assert_eq!(collect(&[REFERENCE.as_bytes()]), "Grüße aus \u{1F30D}");
    }

    #[test]
    fn test_any_single_split_point_gives_same_text() {
        let bytes = REFERENCE.as_bytes();
        for at in 0..=bytes.len() {
            let (a, b) = bytes.split_at(at);
            assert_eq!(collect(&[a, b]), "Grüße aus \u{1F30D}", "split at {}", at);
        }
    }

    #[test]
    fn test_byte_by_byte_delivery() {
        let chunks: Vec<&[u8]> = REFERENCE.as_bytes().chunks(1).collect();
        assert_eq!(collect(&chunks), "Grüße aus \u{1F30D}");
    }

    #[test]
    fn test_multibyte_split_yields_correct_character() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"é\"}}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1;
        let mut parser = StreamParser::new();
        assert!(parser.push(&bytes[..split]).is_empty());
        assert_eq!(parser.push(&bytes[split..]), vec!["é"]);
    }

    #[test]
    fn test_noop_payloads_emit_nothing() {
        let mut parser = StreamParser::new();
        let deltas = parser.push(
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\ndata: {\"usage\":{}}\n\n",
        );
        assert!(deltas.is_empty());
        assert!(!parser.is_done());
    }

    #[test]
    fn test_done_stops_the_feed() {
        let mut parser = StreamParser::new();
        let deltas = parser.push(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        );
        assert_eq!(deltas, vec!["a"]);
        assert!(parser.is_done());
        // Nothing is read after the sentinel
        assert!(parser
            .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"c\"}}]}\n")
            .is_empty());
        // Lines already buffered behind it are still flushed
        assert_eq!(parser.finish(), vec!["b"]);
    }

    #[test]
    fn test_flush_recovers_unterminated_payload() {
        let text = collect(&[b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}"]);
        assert_eq!(text, "tail");
    }

    #[test]
    fn test_unterminated_done_is_skipped_at_flush() {
        let mut parser = StreamParser::new();
        assert_eq!(
            parser.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\ndata: [DO"),
            vec!["x"]
        );
        assert!(parser.push(b"NE]\r").is_empty());
        assert!(!parser.is_done());
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_live_done_still_flushes_leftover() {
        let mut parser = StreamParser::new();
        assert!(parser
            .push(b"data: [DONE]\r\ndata: {\"choices\":[{\"delta\":{\"content\":\"y\"}}]}")
            .is_empty());
        assert!(parser.is_done());
        assert_eq!(parser.finish(), vec!["y"]);
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_done_then_flush_collects_both_sides() {
        let mut parser = StreamParser::new();
        let mut deltas = parser.push(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        );
        deltas.extend(parser.finish());
        assert_eq!(deltas, vec!["a", "b"]);
    }

    #[test]
    fn test_bad_line_then_valid_line_at_end_of_stream() {
        let mut parser = StreamParser::new();
        let mut deltas = parser.push(b"data: {not json}\ndata: {\"choices\":[{\"delta\":{\"content\":\"c\"}}]}\n");
        assert!(deltas.is_empty());
        deltas.extend(parser.finish());
        assert_eq!(deltas, vec!["c"]);
    }

    #[test]
    fn test_flush_processes_lines_after_done() {
        // Flush-time DONE is inert: later leftover lines still count
        let mut parser = StreamParser::new();
        parser.decoder.push(b"data: [DONE]\ndata: {\"choices\":[{\"delta\":{\"content\":\"z\"}}]}");
        assert_eq!(parser.finish(), vec!["z"]);
    }

    #[test]
    fn test_malformed_line_is_dropped_after_one_retry() {
        let mut parser = StreamParser::new();
        assert!(parser.push(b"data: {broken\n").is_empty());
        assert_eq!(parser.decoder.buffered(), "data: {broken\n");

        let deltas = parser.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n");
        assert_eq!(deltas, vec!["ok"]);
        assert_eq!(parser.decoder.buffered(), "");
    }

    #[test]
    fn test_comments_and_heartbeats_are_ignored() {
        let text = collect(&[
            b": ping\n\n:\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n: ping\n\n",
        ]);
        assert_eq!(text, "x");
    }
}
