//! The ordered message transcript of one conversation.

use chatify_ai::Message;

/// Chronological list of messages.
///
/// Entries are replaced whole rather than edited in place, so every update is
/// a new `Message` value that observers can compare against the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message and return its index
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Swap in a new version of the message at `index`
    pub fn replace(&mut self, index: usize, message: Message) -> bool {
        match self.messages.get_mut(index) {
            Some(slot) => {
                *slot = message;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<Message> {
        (index < self.messages.len()).then(|| self.messages.remove(index))
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
