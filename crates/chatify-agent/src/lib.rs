//! chatify-agent: chat session runtime
//!
//! This crate owns a conversation transcript and runs the send pipeline:
//! append the user message, stream the reply into the transcript and hand
//! finished messages to the optional conversation store.

pub mod aggregator;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod persistence;
pub mod session;
pub mod store;
pub mod transport;

pub use aggregator::StreamAggregator;
pub use conversation::Transcript;
pub use error::{Error, Result};
pub use events::{ChatEvent, Outcome};
pub use handle::SessionHandle;
pub use persistence::PersistenceWriter;
pub use session::{ChatSession, SendState, SessionConfig, derive_title, truncate_chars};
pub use store::{ConversationRecord, ConversationStore, MemoryStore};
pub use transport::{HttpTransport, Transport};
