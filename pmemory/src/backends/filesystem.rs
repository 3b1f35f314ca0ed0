use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use pchat::{ChatError, ChatFuture, Conversation, ConversationStore};
use pcommon::ConversationId;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

const SCHEMA_VERSION: u32 = 1;
const CONVERSATIONS_DIR: &str = "conversations";

/// One pretty-printed JSON document per conversation under
/// `{root}/conversations/{id}.json`.
#[derive(Debug)]
pub struct FilesystemConversationStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FilesystemConversationStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(CONVERSATIONS_DIR)).map_err(|error| {
            MemoryError::storage(format!("failed to create filesystem store root: {error}"))
        })?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn conversation_path(&self, id: ConversationId) -> PathBuf {
        self.root
            .join(CONVERSATIONS_DIR)
            .join(format!("{id}.json"))
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, MemoryError> {
        self.lock
            .lock()
            .map_err(|_| MemoryError::storage("filesystem store lock poisoned"))
    }

    fn read(&self, id: ConversationId) -> Result<Option<Conversation>, MemoryError> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|error| {
            MemoryError::storage(format!("failed to read conversation file: {error}"))
        })?;
        let document = serde_json::from_slice::<PersistedConversation>(&bytes)?;
        if document.schema_version > SCHEMA_VERSION {
            return Err(MemoryError::serialization(format!(
                "conversation file uses schema version {}, newest supported is {SCHEMA_VERSION}",
                document.schema_version
            )));
        }
        Ok(Some(document.conversation))
    }

    fn write(&self, conversation: &Conversation) -> Result<(), MemoryError> {
        let document = PersistedConversationRef {
            schema_version: SCHEMA_VERSION,
            conversation,
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        write_atomic(&self.conversation_path(conversation.id), &bytes)
    }

    fn remove(&self, id: ConversationId) -> Result<bool, MemoryError> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|error| {
            MemoryError::storage(format!("failed to delete conversation file: {error}"))
        })?;
        Ok(true)
    }

    fn ids(&self) -> Result<Vec<ConversationId>, MemoryError> {
        let entries = fs::read_dir(self.root.join(CONVERSATIONS_DIR)).map_err(|error| {
            MemoryError::storage(format!("failed to list conversation files: {error}"))
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| {
                MemoryError::storage(format!("failed to read directory entry: {error}"))
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<ConversationId>().ok())
            {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }
}

impl ConversationStore for FilesystemConversationStore {
    fn load<'a>(
        &'a self,
        id: ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            Ok(self.read(id)?)
        })
    }

    fn save<'a>(&'a self, conversation: &'a Conversation) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            Ok(self.write(conversation)?)
        })
    }

    fn delete<'a>(&'a self, id: ConversationId) -> ChatFuture<'a, Result<bool, ChatError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            Ok(self.remove(id)?)
        })
    }

    fn list_ids<'a>(&'a self) -> ChatFuture<'a, Result<Vec<ConversationId>, ChatError>> {
        Box::pin(async move {
            let _guard = self.guard()?;
            Ok(self.ids()?)
        })
    }
}

#[derive(Debug, Deserialize)]
struct PersistedConversation {
    schema_version: u32,
    conversation: Conversation,
}

#[derive(Debug, Serialize)]
struct PersistedConversationRef<'a> {
    schema_version: u32,
    conversation: &'a Conversation,
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MemoryError> {
    let Some(parent) = path.parent() else {
        return Err(MemoryError::storage(
            "conversation file missing parent directory",
        ));
    };
    fs::create_dir_all(parent).map_err(|error| {
        MemoryError::storage(format!("failed to create parent directory: {error}"))
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(|error| {
        MemoryError::storage(format!("failed to write temporary conversation file: {error}"))
    })?;

    fs::rename(&tmp, path).map_err(|error| {
        MemoryError::storage(format!("failed to finalize conversation file: {error}"))
    })
}

#[cfg(test)]
mod tests {
    use pbackend::ToolCall;
    use serde_json::json;

    use super::*;

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        std::env::temp_dir().join(format!("pmemory-{prefix}-{unique}"))
    }

    fn sample() -> Conversation {
        let arguments = json!({"a": 5, "b": 3}).as_object().cloned().unwrap_or_default();
        let call = ToolCall::new("add", arguments).with_id("call_1");

        let mut conversation = Conversation::new("qwen3").with_title("sums");
        conversation.add_system_message("Be exact.");
        conversation.add_user_message("5 + 3?");
        conversation.add_assistant_tool_calls("", vec![call]);
        conversation.add_tool_message(json!({"sum": 8}).to_string(), "call_1", "add");
        conversation.add_assistant_message("8");
        conversation
    }

    #[tokio::test]
    async fn conversations_round_trip_with_tool_fields() {
        let root = temp_dir("roundtrip");
        let store = FilesystemConversationStore::new(&root).expect("store should initialize");
        let conversation = sample();

        store.save(&conversation).await.expect("save");
        let loaded = store
            .load(conversation.id)
            .await
            .expect("load")
            .expect("conversation should exist");

        assert_eq!(loaded, conversation);
        assert_eq!(loaded.messages()[3].function_name(), Some("add"));
        assert!(!root
            .join(CONVERSATIONS_DIR)
            .join(format!("{}.json.tmp", conversation.id))
            .exists());

        std::fs::remove_dir_all(&root).expect("temporary directory should be removable");
    }

    #[tokio::test]
    async fn list_and_delete_track_files() {
        let root = temp_dir("list");
        let store = FilesystemConversationStore::new(&root).expect("store should initialize");
        let first = Conversation::new("llama3.2");
        let second = Conversation::new("llama3.2");

        store.save(&first).await.expect("save first");
        store.save(&second).await.expect("save second");
        std::fs::write(root.join(CONVERSATIONS_DIR).join("notes.txt"), "ignored")
            .expect("write stray file");

        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(store.list_ids().await.expect("list"), expected);

        assert!(store.delete(first.id).await.expect("delete"));
        assert!(!store.delete(first.id).await.expect("second delete"));
        assert_eq!(store.list_ids().await.expect("list"), vec![second.id]);
        assert_eq!(store.load(first.id).await.expect("load"), None);

        std::fs::remove_dir_all(&root).expect("temporary directory should be removable");
    }

    #[tokio::test]
    async fn newer_schema_versions_are_rejected() {
        let root = temp_dir("schema");
        let store = FilesystemConversationStore::new(&root).expect("store should initialize");
        let conversation = Conversation::new("llama3.2");
        let document = json!({
            "schema_version": SCHEMA_VERSION + 1,
            "conversation": conversation,
        });
        std::fs::write(
            store.conversation_path(conversation.id),
            serde_json::to_vec(&document).expect("encode"),
        )
        .expect("write future document");

        let error = store
            .load(conversation.id)
            .await
            .expect_err("future schema should fail");
        assert!(error.message.contains("schema version"));

        std::fs::remove_dir_all(&root).expect("temporary directory should be removable");
    }
}
