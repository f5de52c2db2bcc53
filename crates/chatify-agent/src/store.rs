//! Conversation persistence interface and an in-memory implementation

use std::collections::HashMap;

use async_trait::async_trait;
use chatify_ai::Message;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A stored conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Backing store for conversations and their messages
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a conversation owned by `user_id`
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<ConversationRecord>;

    /// Append a message to a conversation
    async fn save_message(&self, conversation_id: &str, message: &Message) -> Result<()>;

    /// Bump the conversation's `updated_at`
    async fn touch_conversation(&self, conversation_id: &str) -> Result<()>;

    async fn rename_conversation(&self, conversation_id: &str, title: &str) -> Result<()>;

    /// Conversations of a user, most recently updated first
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationRecord>>;

    /// Messages of a conversation, oldest first
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;
}

/// Process-local store, useful for ephemeral sessions and tests
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    conversations: Vec<ConversationRecord>,
    messages: HashMap<String, Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn record_mut(&mut self, conversation_id: &str) -> Result<&mut ConversationRecord> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| Error::NotFound(conversation_id.to_string()))
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<ConversationRecord> {
        let now = Utc::now();
        let record = ConversationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.lock();
        inner.messages.insert(record.id.clone(), Vec::new());
        inner.conversations.push(record.clone());
        Ok(record)
    }

    async fn save_message(&self, conversation_id: &str, message: &Message) -> Result<()> {
        let mut inner = self.inner.lock();
        inner
            .messages
            .get_mut(conversation_id)
            .ok_or_else(|| Error::NotFound(conversation_id.to_string()))?
            .push(message.clone());
        Ok(())
    }

    async fn touch_conversation(&self, conversation_id: &str) -> Result<()> {
        self.inner.lock().record_mut(conversation_id)?.updated_at = Utc::now();
        Ok(())
    }

    async fn rename_conversation(&self, conversation_id: &str, title: &str) -> Result<()> {
        self.inner.lock().record_mut(conversation_id)?.title = title.to_string();
        Ok(())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationRecord>> {
        let inner = self.inner.lock();
        let mut list: Vec<_> = inner
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.inner
            .lock()
            .messages
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(conversation_id.to_string()))
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let before = inner.conversations.len();
        inner.conversations.retain(|c| c.id != conversation_id);
        if inner.conversations.len() == before {
            return Err(Error::NotFound(conversation_id.to_string()));
        }
        inner.messages.remove(conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_save_and_list() {
        let store = MemoryStore::new();
        let conv = store.create_conversation("u1", "Hello").await.unwrap();
        store.save_message(&conv.id, &Message::user("hi")).await.unwrap();
        store
            .save_message(&conv.id, &Message::assistant("hey"))
            .await
            .unwrap();

        let messages = store.list_messages(&conv.id).await.unwrap();
        assert_eq!(messages, vec![Message::user("hi"), Message::assistant("hey")]);
        assert!(store.list_conversations("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_by_updated_desc() {
        let store = MemoryStore::new();
        let a = store.create_conversation("u1", "a").await.unwrap();
        let b = store.create_conversation("u1", "b").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.touch_conversation(&a.id).await.unwrap();

        let ids: Vec<_> = store
            .list_conversations("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let store = MemoryStore::new();
        let conv = store.create_conversation("u1", "old").await.unwrap();
        store.rename_conversation(&conv.id, "new").await.unwrap();
        assert_eq!(store.list_conversations("u1").await.unwrap()[0].title, "new");

        store.delete_conversation(&conv.id).await.unwrap();
        assert!(store.list_conversations("u1").await.unwrap().is_empty());
        assert!(matches!(
            store.list_messages(&conv.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.delete_conversation(&conv.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_to_unknown_conversation_fails() {
        let store = MemoryStore::new();
        assert!(store.save_message("nope", &Message::user("x")).await.is_err());
        assert!(store.touch_conversation("nope").await.is_err());
    }
}
