//! Background writer for best-effort message persistence

use std::sync::Arc;

use chatify_ai::Message;
use tokio::sync::{mpsc, oneshot};

use crate::store::ConversationStore;

enum WriteOp {
    Save {
        conversation_id: String,
        message: Message,
    },
    Flush(oneshot::Sender<()>),
}

/// Queues message writes so they never block the streaming path.
///
/// Writes are applied in submission order by a single task. Each saved
/// message is followed by a touch of its conversation. Failures are logged
/// and otherwise ignored.
#[derive(Clone)]
pub struct PersistenceWriter {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl PersistenceWriter {
    /// Start the writer task. Must be called within a Tokio runtime.
    pub fn spawn(store: Arc<dyn ConversationStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    WriteOp::Save {
                        conversation_id,
                        message,
                    } => {
                        if let Err(e) = store.save_message(&conversation_id, &message).await {
                            tracing::warn!(
                                "Failed to save {} message to {}: {}",
                                message.role,
                                conversation_id,
                                e
                            );
                        }
                        if let Err(e) = store.touch_conversation(&conversation_id).await {
                            tracing::warn!("Failed to touch conversation {}: {}", conversation_id, e);
                        }
                    }
                    WriteOp::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx }
    }

    /// Queue a message for saving
    pub fn save(&self, conversation_id: &str, message: Message) {
        let op = WriteOp::Save {
            conversation_id: conversation_id.to_string(),
            message,
        };
        if self.tx.send(op).is_err() {
            tracing::warn!("Persistence writer stopped, dropping message");
        }
    }

    /// Wait until every write queued so far has been applied
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}
