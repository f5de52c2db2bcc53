//! Session event types

use chatify_ai::Message;
use serde::{Deserialize, Serialize};

/// How a send ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed,
}

/// Events emitted while a session changes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A send was accepted
    SendStart,

    /// A message was appended to the transcript
    MessageAppended { index: usize, message: Message },

    /// The first response chunk arrived
    StreamStart,

    /// The streaming assistant message has a new version
    MessageUpdate { index: usize, message: Message },

    /// An empty assistant placeholder was rolled back
    MessageRemoved { index: usize },

    /// A send settled
    SendEnd { outcome: Outcome },

    /// A backing conversation record was created
    ConversationCreated { id: String, title: String },

    /// A stored conversation was loaded into the transcript
    ConversationOpened { id: String },

    /// The transcript was reset for a new chat
    Cleared,

    /// User-facing error notification
    Error { message: String },
}

impl ChatEvent {
    /// Check if this is a terminal event for a send
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::SendEnd { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = ChatEvent::MessageUpdate {
            index: 1,
            message: Message::assistant("Hel"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message_update");
        assert_eq!(json["index"], 1);
        assert_eq!(json["message"]["role"], "assistant");

        let end = serde_json::to_value(ChatEvent::SendEnd {
            outcome: Outcome::Failed,
        })
        .unwrap();
        assert_eq!(end, serde_json::json!({"type": "send_end", "outcome": "failed"}));
    }

    #[test]
    fn test_only_send_end_is_terminal() {
        assert!(ChatEvent::SendEnd { outcome: Outcome::Success }.is_terminal());
        assert!(!ChatEvent::StreamStart.is_terminal());
        assert!(!ChatEvent::Error { message: "x".into() }.is_terminal());
    }
}
