//! Store selection and construction.

use std::path::PathBuf;
use std::sync::Arc;

use pchat::{ConversationStore, InMemoryConversationStore};

use crate::backends::sqlite::default_sqlite_path;
use crate::error::MemoryError;
use crate::{FilesystemConversationStore, SqliteConversationStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    Filesystem { root: PathBuf },
    InMemory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

pub fn create_conversation_store(
    config: StoreConfig,
) -> Result<Arc<dyn ConversationStore>, MemoryError> {
    match config {
        StoreConfig::Sqlite { path } => Ok(Arc::new(SqliteConversationStore::new(path)?)),
        StoreConfig::Filesystem { root } => Ok(Arc::new(FilesystemConversationStore::new(root)?)),
        StoreConfig::InMemory => Ok(Arc::new(InMemoryConversationStore::new())),
    }
}

pub fn create_default_conversation_store() -> Result<Arc<dyn ConversationStore>, MemoryError> {
    create_conversation_store(StoreConfig::default())
}
