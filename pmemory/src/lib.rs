//! Durable [`ConversationStore`](pchat::ConversationStore) implementations.
//!
//! ```rust
//! use pchat::{Conversation, ConversationStore};
//! use pmemory::{StoreConfig, create_conversation_store};
//!
//! # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
//! let store = create_conversation_store(StoreConfig::InMemory).expect("in-memory store");
//! let mut conversation = Conversation::new("llama3.2");
//! conversation.add_user_message("remember me");
//!
//! store.save(&conversation).await.expect("save");
//! let loaded = store.load(conversation.id).await.expect("load");
//! assert_eq!(loaded.map(|c| c.len()), Some(1));
//! # });
//! ```

mod backends;
mod config;
mod error;

pub mod prelude {
    pub use crate::{
        FilesystemConversationStore, MemoryError, MemoryErrorKind, SqliteConversationStore,
        StoreConfig, create_conversation_store, create_default_conversation_store,
    };
    pub use pchat::{ConversationStore, InMemoryConversationStore};
}

pub use backends::filesystem::FilesystemConversationStore;
pub use backends::sqlite::{SQLITE_PATH_ENV, SqliteConversationStore};
pub use config::{StoreConfig, create_conversation_store, create_default_conversation_store};
pub use error::{MemoryError, MemoryErrorKind};
