//! Conversations saved as JSONL files, one file per conversation

use async_trait::async_trait;
use chatify_agent::{ConversationRecord, ConversationStore, Error, Result};
use chatify_ai::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Entry types of a conversation file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEntry {
    /// Always the first line
    Metadata {
        id: String,
        user_id: String,
        title: String,
        created_at: DateTime<Utc>,
    },
    /// A message in the conversation
    Message {
        message: Message,
        timestamp: DateTime<Utc>,
    },
    /// The conversation was updated
    Touch { timestamp: DateTime<Utc> },
    /// The conversation was renamed
    Title {
        title: String,
        timestamp: DateTime<Utc>,
    },
}

/// A conversation file read back into memory
struct Loaded {
    record: ConversationRecord,
    messages: Vec<Message>,
}

/// [`ConversationStore`] writing under a directory on disk
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    /// Get the default conversations directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatify")
            .join("conversations")
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, conversation_id: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", conversation_id))
    }

    fn existing_path(&self, conversation_id: &str) -> Result<PathBuf> {
        let path = self.path(conversation_id);
        // Ids never contain separators; anything else is not ours
        if conversation_id.contains(['/', '\\']) || !path.is_file() {
            return Err(Error::NotFound(conversation_id.to_string()));
        }
        Ok(path)
    }

    fn append(&self, conversation_id: &str, entry: &ConversationEntry) -> Result<()> {
        let path = self.existing_path(conversation_id)?;
        let mut file = File::options()
            .read(true)
            .append(true)
            .open(path)
            .map_err(store_err)?;
        let mut line = serde_json::to_string(entry).map_err(store_err)?;
        line.push('\n');
        // Start on a fresh line after a torn write
        if !ends_with_newline(&mut file).map_err(store_err)? {
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes()).map_err(store_err)
    }

    fn load(path: &Path) -> Result<Loaded> {
        let file = File::open(path).map_err(store_err)?;
        let mut lines = BufReader::new(file).lines();

        let first = lines
            .next()
            .transpose()
            .map_err(store_err)?
            .ok_or_else(|| Error::Store(format!("{} is empty", path.display())))?;
        let ConversationEntry::Metadata {
            id,
            user_id,
            title,
            created_at,
        } = serde_json::from_str(&first).map_err(store_err)?
        else {
            return Err(Error::Store(format!("{} has no metadata", path.display())));
        };

        let mut record = ConversationRecord {
            id,
            user_id,
            title,
            created_at,
            updated_at: created_at,
        };
        let mut messages = Vec::new();

        for line in lines {
            let line = line.map_err(store_err)?;
            if line.trim().is_empty() {
                continue;
            }
            // A torn final line from an interrupted write is skipped
            let Ok(entry) = serde_json::from_str::<ConversationEntry>(&line) else {
                tracing::warn!("Skipping unreadable entry in {}", path.display());
                continue;
            };
            match entry {
                ConversationEntry::Message { message, .. } => messages.push(message),
                ConversationEntry::Touch { timestamp } => {
                    record.updated_at = record.updated_at.max(timestamp);
                }
                ConversationEntry::Title { title, .. } => record.title = title,
                ConversationEntry::Metadata { .. } => {}
            }
        }

        Ok(Loaded { record, messages })
    }
}

/// Whether the file is empty or its last byte is a newline
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.seek(SeekFrom::End(0))? == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn store_err(e: impl std::fmt::Display) -> Error {
    Error::Store(e.to_string())
}

#[async_trait]
impl ConversationStore for JsonlStore {
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<ConversationRecord> {
        fs::create_dir_all(&self.root).map_err(store_err)?;

        let now = Utc::now();
        let record = ConversationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        let metadata = ConversationEntry::Metadata {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            title: record.title.clone(),
            created_at: now,
        };

        let mut file = File::create(self.path(&record.id)).map_err(store_err)?;
        let line = serde_json::to_string(&metadata).map_err(store_err)?;
        writeln!(file, "{}", line).map_err(store_err)?;
        Ok(record)
    }

    async fn save_message(&self, conversation_id: &str, message: &Message) -> Result<()> {
        self.append(
            conversation_id,
            &ConversationEntry::Message {
                message: message.clone(),
                timestamp: Utc::now(),
            },
        )
    }

    async fn touch_conversation(&self, conversation_id: &str) -> Result<()> {
        self.append(
            conversation_id,
            &ConversationEntry::Touch {
                timestamp: Utc::now(),
            },
        )
    }

    async fn rename_conversation(&self, conversation_id: &str, title: &str) -> Result<()> {
        self.append(
            conversation_id,
            &ConversationEntry::Title {
                title: title.to_string(),
                timestamp: Utc::now(),
            },
        )
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationRecord>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(store_err)? {
            let path = entry.map_err(store_err)?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }
            match Self::load(&path) {
                Ok(loaded) if loaded.record.user_id == user_id => records.push(loaded.record),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let path = self.existing_path(conversation_id)?;
        Ok(Self::load(&path)?.messages)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let path = self.existing_path(conversation_id)?;
        fs::remove_file(path).map_err(store_err)
    }
}
