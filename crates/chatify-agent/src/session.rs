//! Chat session state and the send pipeline

use std::sync::Arc;

use chatify_ai::{Message, StreamParser};
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    aggregator::StreamAggregator,
    conversation::Transcript,
    error::{Error, Result},
    events::{ChatEvent, Outcome},
    handle::SessionHandle,
    persistence::PersistenceWriter,
    store::{ConversationRecord, ConversationStore},
    transport::Transport,
};

/// Default length of a derived conversation title, in characters
pub const DEFAULT_TITLE_CHARS: usize = 50;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Titles longer than this are truncated and suffixed with `...`
    pub title_max_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            title_max_chars: DEFAULT_TITLE_CHARS,
        }
    }
}

/// Lifecycle of a single send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    /// User message appended, waiting for the first response chunk
    Sending,
    Streaming,
    Settled(Outcome),
}

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Build a conversation title from the first message
pub fn derive_title(input: &str, max_chars: usize) -> String {
    truncate_chars(input.trim(), max_chars)
}

/// One conversation with the completion endpoint.
///
/// Owns the transcript and runs sends one at a time. Persistence is optional:
/// without a store or without a user id every send is ephemeral.
pub struct ChatSession {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn ConversationStore>>,
    writer: Option<PersistenceWriter>,
    user_id: Option<String>,
    transcript: Transcript,
    conversation_id: Option<String>,
    state: SendState,
    last_error: Option<String>,
    event_tx: broadcast::Sender<ChatEvent>,
    handle: SessionHandle,
}

impl ChatSession {
    /// Create a new ephemeral session
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            transport,
            store: None,
            writer: None,
            user_id: None,
            transcript: Transcript::new(),
            conversation_id: None,
            state: SendState::Idle,
            last_error: None,
            event_tx,
            handle: SessionHandle::new(),
        }
    }

    /// Attach a conversation store. Starts the background writer, so this
    /// must be called within a Tokio runtime.
    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.writer = Some(PersistenceWriter::spawn(Arc::clone(&store)));
        self.store = Some(store);
        self
    }

    /// Set the signed-in user; `None` makes the session ephemeral
    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// User-facing message of the last failed send
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Get a cloneable handle for aborting from outside
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Abort the current send
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_sending(&self) -> bool {
        self.handle.is_sending()
    }

    /// Start a new chat: abort anything in flight and forget the transcript
    pub fn new_chat(&mut self) {
        self.handle.abort();
        self.transcript.clear();
        self.conversation_id = None;
        self.last_error = None;
        self.state = SendState::Idle;
        let _ = self.event_tx.send(ChatEvent::Cleared);
    }

    /// Wait until every queued persistence write has been applied
    pub async fn flush(&self) {
        if let Some(ref writer) = self.writer {
            writer.flush().await;
        }
    }

    /// Stored conversations of the current user, newest first
    pub async fn conversations(&self) -> Result<Vec<ConversationRecord>> {
        match (&self.store, &self.user_id) {
            (Some(store), Some(user_id)) => store.list_conversations(user_id).await,
            _ => Ok(Vec::new()),
        }
    }

    /// Replace the transcript with a stored conversation
    pub async fn open_conversation(&mut self, conversation_id: &str) -> Result<()> {
        let store = self.persistent_store()?;
        let messages = store.list_messages(conversation_id).await?;

        self.handle.abort();
        self.transcript = Transcript::from_messages(messages);
        self.conversation_id = Some(conversation_id.to_string());
        self.last_error = None;
        self.state = SendState::Idle;
        info!("Opened conversation {} ({} messages)", conversation_id, self.transcript.len());
        let _ = self.event_tx.send(ChatEvent::ConversationOpened {
            id: conversation_id.to_string(),
        });
        Ok(())
    }

    /// Delete a stored conversation; deleting the current one starts a new chat
    pub async fn delete_conversation(&mut self, conversation_id: &str) -> Result<()> {
        let store = self.persistent_store()?;
        store.delete_conversation(conversation_id).await?;
        if self.conversation_id.as_deref() == Some(conversation_id) {
            self.new_chat();
        }
        Ok(())
    }

    pub async fn rename_conversation(&self, conversation_id: &str, title: &str) -> Result<()> {
        let store = self.persistent_store()?;
        store.rename_conversation(conversation_id, title.trim()).await
    }

    fn persistent_store(&self) -> Result<Arc<dyn ConversationStore>> {
        match (&self.store, &self.user_id) {
            (Some(store), Some(_)) => Ok(Arc::clone(store)),
            _ => Err(Error::NoPersistence),
        }
    }

    /// Send user input and stream the reply into the transcript.
    ///
    /// Blank input is rejected with [`Error::EmptyInput`] and a call while
    /// another send is running with [`Error::Busy`]. Transport failures do not
    /// return `Err`: they settle the send as [`Outcome::Failed`] and are
    /// published as [`ChatEvent::Error`].
    pub async fn send(&mut self, input: &str) -> Result<Outcome> {
        let text = input.trim();
        if text.is_empty() {
            return Err(Error::EmptyInput);
        }
        if !self.handle.try_begin() {
            return Err(Error::Busy);
        }

        let cancel = self.handle.reset_cancel();
        self.last_error = None;
        let _ = self.event_tx.send(ChatEvent::SendStart);

        let outcome = self.run_send(text, &cancel).await;

        self.set_state(SendState::Settled(outcome));
        let _ = self.event_tx.send(ChatEvent::SendEnd { outcome });
        self.handle.finish();
        Ok(outcome)
    }

    async fn run_send(&mut self, text: &str, cancel: &CancellationToken) -> Outcome {
        self.set_state(SendState::Sending);

        let user_message = Message::user(text);
        let index = self.transcript.push(user_message.clone());
        let _ = self.event_tx.send(ChatEvent::MessageAppended {
            index,
            message: user_message.clone(),
        });

        if let Some(conversation_id) = self.ensure_conversation(text).await {
            self.persist(&conversation_id, user_message);
        }

        let mut aggregator = StreamAggregator::new();

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(chatify_ai::Error::Aborted),
            result = self.transport.open(self.transcript.messages()) => result,
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(e) => return self.fail(e, &mut aggregator),
        };

        let mut parser = StreamParser::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                chunk = body.next() => Some(chunk),
            };
            let chunk = match next {
                None => return self.fail(chatify_ai::Error::Aborted, &mut aggregator),
                Some(None) => break,
                Some(Some(Err(e))) => return self.fail(e, &mut aggregator),
                Some(Some(Ok(chunk))) => chunk,
            };

            if self.state == SendState::Sending {
                self.set_state(SendState::Streaming);
                let _ = self.event_tx.send(ChatEvent::StreamStart);
            }

            for delta in parser.push(&chunk) {
                self.apply_delta(&mut aggregator, &delta);
            }
            if parser.is_done() {
                break;
            }
        }
        for delta in parser.finish() {
            self.apply_delta(&mut aggregator, &delta);
        }

        let reply = aggregator.into_text();
        if reply.is_empty() {
            debug!("Response finished without any text");
        } else if let Some(conversation_id) = self.persisted_conversation() {
            self.persist(&conversation_id, Message::assistant(reply));
        }
        Outcome::Success
    }

    fn apply_delta(&mut self, aggregator: &mut StreamAggregator, delta: &str) {
        let Some(index) = aggregator.apply(delta, &mut self.transcript) else {
            return;
        };
        if let Some(message) = self.transcript.get(index) {
            let _ = self.event_tx.send(ChatEvent::MessageUpdate {
                index,
                message: message.clone(),
            });
        }
    }

    fn fail(&mut self, error: chatify_ai::Error, aggregator: &mut StreamAggregator) -> Outcome {
        if let Some(index) = aggregator.rollback(&mut self.transcript) {
            let _ = self.event_tx.send(ChatEvent::MessageRemoved { index });
        }

        if error.is_aborted() {
            info!("Send cancelled");
            return Outcome::Failed;
        }

        warn!("Send failed: {}", error);
        let message = error.user_message();
        self.last_error = Some(message.clone());
        let _ = self.event_tx.send(ChatEvent::Error { message });
        Outcome::Failed
    }

    /// Id of the backing conversation, creating it on the first send
    async fn ensure_conversation(&mut self, first_message: &str) -> Option<String> {
        let user_id = self.user_id.clone()?;
        let store = self.store.clone()?;
        if let Some(ref id) = self.conversation_id {
            return Some(id.clone());
        }

        let title = derive_title(first_message, self.config.title_max_chars);
        match store.create_conversation(&user_id, &title).await {
            Ok(record) => {
                info!("Created conversation {} ({:?})", record.id, record.title);
                self.conversation_id = Some(record.id.clone());
                let _ = self.event_tx.send(ChatEvent::ConversationCreated {
                    id: record.id.clone(),
                    title: record.title,
                });
                Some(record.id)
            }
            Err(e) => {
                warn!("Failed to create conversation: {}", e);
                None
            }
        }
    }

    fn persisted_conversation(&self) -> Option<String> {
        self.user_id.as_ref()?;
        self.conversation_id.clone()
    }

    fn persist(&self, conversation_id: &str, message: Message) {
        if let Some(ref writer) = self.writer {
            writer.save(conversation_id, message);
        }
    }

    fn set_state(&mut self, state: SendState) {
        debug!("Send state {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}
