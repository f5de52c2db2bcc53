//! Accumulation of streamed deltas into the assistant message

use chatify_ai::Message;

use crate::conversation::Transcript;

/// Owns the growing reply text for one send.
///
/// The assistant message is created lazily on the first non-empty delta, so
/// a response that never produces text leaves nothing in the transcript.
#[derive(Debug, Default)]
pub struct StreamAggregator {
    text: String,
    /// Transcript index of the assistant message this response owns
    open: Option<usize>,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and publish the new text into the transcript.
    ///
    /// Returns the index of the updated message, or `None` for an empty delta.
    pub fn apply(&mut self, delta: &str, transcript: &mut Transcript) -> Option<usize> {
        if delta.is_empty() {
            return None;
        }
        self.text.push_str(delta);

        let message = Message::assistant(self.text.clone());
        match self.open {
            Some(index) => {
                debug_assert_eq!(index + 1, transcript.len(), "open message must be last");
                transcript.replace(index, message);
                Some(index)
            }
            None => {
                let index = transcript.push(message);
                self.open = Some(index);
                Some(index)
            }
        }
    }

    /// Remove the owned assistant message if it is still empty.
    ///
    /// `apply` only creates the message with text in it, so after a normal
    /// stream this finds nothing to remove. It still guards the transcript
    /// against an empty assistant entry if the message was emptied elsewhere.
    pub fn rollback(&mut self, transcript: &mut Transcript) -> Option<usize> {
        let index = self.open?;
        let empty = transcript
            .get(index)
            .is_some_and(|m| m.is_assistant() && m.content.is_empty());
        if !empty {
            return None;
        }
        transcript.remove(index);
        self.open = None;
        Some(index)
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
