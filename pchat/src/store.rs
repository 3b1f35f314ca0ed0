//! Conversation storage contracts and a basic in-memory implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use pcommon::{BoxFuture, ConversationId};

use crate::{ChatError, Conversation};

pub type ChatFuture<'a, T> = BoxFuture<'a, T>;

pub trait ConversationStore: Send + Sync {
    fn load<'a>(
        &'a self,
        id: ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>>;

    /// Inserts or replaces the stored copy of `conversation`.
    fn save<'a>(&'a self, conversation: &'a Conversation) -> ChatFuture<'a, Result<(), ChatError>>;

    /// Returns whether a conversation was removed.
    fn delete<'a>(&'a self, id: ConversationId) -> ChatFuture<'a, Result<bool, ChatError>>;

    fn list_ids<'a>(&'a self) -> ChatFuture<'a, Result<Vec<ConversationId>, ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: Mutex<HashMap<ConversationId, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn conversations(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ConversationId, Conversation>>, ChatError> {
        self.conversations
            .lock()
            .map_err(|_| ChatError::store("conversation store lock poisoned"))
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn load<'a>(
        &'a self,
        id: ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move { Ok(self.conversations()?.get(&id).cloned()) })
    }

    fn save<'a>(&'a self, conversation: &'a Conversation) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.conversations()?
                .insert(conversation.id, conversation.clone());
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: ConversationId) -> ChatFuture<'a, Result<bool, ChatError>> {
        Box::pin(async move { Ok(self.conversations()?.remove(&id).is_some()) })
    }

    fn list_ids<'a>(&'a self) -> ChatFuture<'a, Result<Vec<ConversationId>, ChatError>> {
        Box::pin(async move {
            let mut ids: Vec<ConversationId> = self.conversations()?.keys().copied().collect();
            ids.sort();
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saved_conversations_load_back_unchanged() {
        let store = InMemoryConversationStore::new();
        let mut conversation = Conversation::new("llama3.2");
        conversation.add_user_message("hello");

        store.save(&conversation).await.expect("save");
        let loaded = store.load(conversation.id).await.expect("load");

        assert_eq!(loaded, Some(conversation));
    }

    #[tokio::test]
    async fn save_replaces_and_delete_removes() {
        let store = InMemoryConversationStore::new();
        let mut conversation = Conversation::new("llama3.2");
        store.save(&conversation).await.expect("first save");

        conversation.add_user_message("more");
        store.save(&conversation).await.expect("second save");
        assert_eq!(store.list_ids().await.expect("list"), vec![conversation.id]);
        assert_eq!(
            store
                .load(conversation.id)
                .await
                .expect("load")
                .map(|c| c.len()),
            Some(1)
        );

        assert!(store.delete(conversation.id).await.expect("delete"));
        assert!(!store.delete(conversation.id).await.expect("second delete"));
        assert_eq!(store.load(conversation.id).await.expect("load"), None);
    }
}
