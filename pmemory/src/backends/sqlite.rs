use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use pbackend::{Role, ToolCall};
use pchat::{ChatError, ChatFuture, Conversation, ConversationStore, Message};
use pcommon::{ConversationId, MessageId, MetadataMap};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::MemoryError;

pub const SQLITE_PATH_ENV: &str = "PARLEY_SQLITE_PATH";

#[derive(Debug)]
pub struct SqliteConversationStore {
    connection: Mutex<Connection>,
}

impl SqliteConversationStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                MemoryError::storage(format!(
                    "failed to create sqlite parent directory: {error}"
                ))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            MemoryError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, MemoryError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            MemoryError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, MemoryError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                MemoryError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.connection
            .lock()
            .map_err(|_| MemoryError::storage("sqlite store lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), MemoryError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                title TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                metadata_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                conversation_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                tool_calls_json TEXT,
                tool_call_id TEXT,
                PRIMARY KEY (conversation_id, position)
            );
            ",
        )
        .map_err(|error| {
            MemoryError::storage(format!("failed to initialize sqlite schema: {error}"))
        })?;

        Ok(())
    }

    fn load_conversation(&self, id: ConversationId) -> Result<Option<Conversation>, MemoryError> {
        let conn = self.connection()?;
        let header = conn
            .query_row(
                "
                SELECT model, title, created_at, updated_at, metadata_json
                FROM conversations
                WHERE id = ?1
                ",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((model, title, created_at, updated_at, metadata_json)) = header else {
            return Ok(None);
        };

        let mut statement = conn.prepare(
            "
            SELECT id, role, content, created_at, metadata_json, tool_calls_json, tool_call_id
            FROM messages
            WHERE conversation_id = ?1
            ORDER BY position
            ",
        )?;
        let rows = statement.query_map(params![id.to_string()], StoredMessage::from_row)?;
        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?.into_message()?);
        }

        let mut conversation = Conversation::restore(
            id,
            model,
            messages,
            decode_timestamp(&created_at)?,
            decode_timestamp(&updated_at)?,
        );
        conversation.title = title;
        conversation.metadata = serde_json::from_str::<MetadataMap>(&metadata_json)?;
        Ok(Some(conversation))
    }

    fn save_conversation(&self, conversation: &Conversation) -> Result<(), MemoryError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let id = conversation.id.to_string();

        tx.execute(
            "
            INSERT INTO conversations (id, model, title, created_at, updated_at, metadata_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                model = excluded.model,
                title = excluded.title,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                metadata_json = excluded.metadata_json
            ",
            params![
                &id,
                &conversation.model,
                conversation.title.as_deref(),
                encode_timestamp(conversation.created_at),
                encode_timestamp(conversation.updated_at),
                serde_json::to_string(&conversation.metadata)?,
            ],
        )
        .map_err(|error| {
            MemoryError::storage(format!("failed to upsert conversation row: {error}"))
        })?;

        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![&id],
        )
        .map_err(|error| MemoryError::storage(format!("failed to clear message rows: {error}")))?;

        for (position, message) in conversation.messages().iter().enumerate() {
            let tool_calls_json = message
                .tool_calls
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            tx.execute(
                "
                INSERT INTO messages (
                    conversation_id,
                    position,
                    id,
                    role,
                    content,
                    created_at,
                    metadata_json,
                    tool_calls_json,
                    tool_call_id
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
                params![
                    &id,
                    position as i64,
                    message.id.to_string(),
                    message.role.as_str(),
                    &message.content,
                    encode_timestamp(message.created_at),
                    serde_json::to_string(&message.metadata)?,
                    tool_calls_json,
                    message.tool_call_id.as_deref(),
                ],
            )
            .map_err(|error| {
                MemoryError::storage(format!("failed to write message row: {error}"))
            })?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_conversation(&self, id: ConversationId) -> Result<bool, MemoryError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![id.to_string()],
        )?;
        let removed = tx.execute(
            "DELETE FROM conversations WHERE id = ?1",
            params![id.to_string()],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn conversation_ids(&self) -> Result<Vec<ConversationId>, MemoryError> {
        let conn = self.connection()?;
        let mut statement = conn.prepare("SELECT id FROM conversations")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            let raw = row?;
            ids.push(ConversationId::from_str(&raw).map_err(|error| {
                MemoryError::serialization(format!("invalid conversation id '{raw}': {error}"))
            })?);
        }
        ids.sort();
        Ok(ids)
    }
}

impl ConversationStore for SqliteConversationStore {
    fn load<'a>(
        &'a self,
        id: ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move { Ok(self.load_conversation(id)?) })
    }

    fn save<'a>(&'a self, conversation: &'a Conversation) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move { Ok(self.save_conversation(conversation)?) })
    }

    fn delete<'a>(&'a self, id: ConversationId) -> ChatFuture<'a, Result<bool, ChatError>> {
        Box::pin(async move { Ok(self.delete_conversation(id)?) })
    }

    fn list_ids<'a>(&'a self) -> ChatFuture<'a, Result<Vec<ConversationId>, ChatError>> {
        Box::pin(async move { Ok(self.conversation_ids()?) })
    }
}

struct StoredMessage {
    id: String,
    role: String,
    content: String,
    created_at: String,
    metadata_json: String,
    tool_calls_json: Option<String>,
    tool_call_id: Option<String>,
}

impl StoredMessage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            role: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            metadata_json: row.get(4)?,
            tool_calls_json: row.get(5)?,
            tool_call_id: row.get(6)?,
        })
    }

    fn into_message(self) -> Result<Message, MemoryError> {
        let id = MessageId::from_str(&self.id).map_err(|error| {
            MemoryError::serialization(format!("invalid message id '{}': {error}", self.id))
        })?;
        let role = Role::from_str(&self.role).map_err(|_| {
            MemoryError::serialization(format!("unknown message role value '{}'", self.role))
        })?;
        let tool_calls = self
            .tool_calls_json
            .as_deref()
            .map(serde_json::from_str::<Vec<ToolCall>>)
            .transpose()?;

        Ok(Message {
            id,
            role,
            content: self.content,
            created_at: decode_timestamp(&self.created_at)?,
            metadata: serde_json::from_str(&self.metadata_json)?,
            tool_calls,
            tool_call_id: self.tool_call_id,
        })
    }
}

fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(value: &str) -> Result<DateTime<Utc>, MemoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| MemoryError::serialization(format!("invalid timestamp '{value}': {error}")))
}

pub(crate) fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os(SQLITE_PATH_ENV) {
        return PathBuf::from(explicit);
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home)
            .join(".parley")
            .join("conversations.sqlite3");
    }

    std::env::temp_dir().join("parley-conversations.sqlite3")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Conversation {
        let arguments = json!({"city": "Oslo"}).as_object().cloned().unwrap_or_default();
        let call = ToolCall::new("weather", arguments).with_id("call_7");

        let mut conversation = Conversation::new("llama3.2").with_title("weather");
        conversation
            .metadata
            .insert("tenant".to_string(), json!("acme"));
        conversation.add_system_message("You report weather.");
        conversation.add_user_message("Weather in Oslo?");
        conversation.add_assistant_tool_calls("", vec![call]);
        conversation.add_tool_message("{\"temp_c\":4}", "call_7", "weather");
        conversation.add_assistant_message("It is 4 degrees.");
        conversation
    }

    #[tokio::test]
    async fn conversations_round_trip_exactly() {
        let store = SqliteConversationStore::new_in_memory().expect("sqlite store should open");
        let conversation = sample();

        store.save(&conversation).await.expect("save");
        let loaded = store
            .load(conversation.id)
            .await
            .expect("load")
            .expect("conversation should exist");

        assert_eq!(loaded, conversation);
        assert_eq!(loaded.messages()[2].tool_calls.as_ref().map(Vec::len), Some(1));
        assert_eq!(loaded.messages()[3].function_name(), Some("weather"));
    }

    #[tokio::test]
    async fn saving_again_replaces_messages() {
        let store = SqliteConversationStore::new_in_memory().expect("sqlite store should open");
        let mut conversation = sample();
        store.save(&conversation).await.expect("first save");

        conversation.clear();
        conversation.add_user_message("fresh start");
        store.save(&conversation).await.expect("second save");

        let loaded = store
            .load(conversation.id)
            .await
            .expect("load")
            .expect("conversation should exist");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.messages()[0].content, "fresh start");
    }

    #[tokio::test]
    async fn delete_and_list_reflect_rows() {
        let store = SqliteConversationStore::new_in_memory().expect("sqlite store should open");
        let first = sample();
        let second = Conversation::new("qwen3");
        store.save(&first).await.expect("save first");
        store.save(&second).await.expect("save second");

        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(store.list_ids().await.expect("list"), expected);

        assert!(store.delete(first.id).await.expect("delete"));
        assert!(!store.delete(first.id).await.expect("second delete"));
        assert_eq!(store.load(first.id).await.expect("load"), None);
        assert_eq!(store.list_ids().await.expect("list"), vec![second.id]);
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let unique = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let root = std::env::temp_dir().join(format!("pmemory-sqlite-{unique}"));
        let path = root.join("nested").join("conversations.sqlite3");
        let conversation = sample();

        {
            let store = SqliteConversationStore::new(&path).expect("sqlite store should open");
            store.save(&conversation).await.expect("save");
        }

        let reopened = SqliteConversationStore::new(&path).expect("sqlite store should reopen");
        let loaded = reopened
            .load(conversation.id)
            .await
            .expect("load")
            .expect("conversation should exist");
        assert_eq!(loaded, conversation);

        drop(reopened);
        std::fs::remove_dir_all(&root).expect("temporary directory should be removable");
    }

    #[test]
    fn timestamps_keep_nanosecond_precision() {
        let now = Utc::now();
        assert_eq!(decode_timestamp(&encode_timestamp(now)), Ok(now));
        assert!(decode_timestamp("yesterday").is_err());
    }
}
