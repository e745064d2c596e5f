//! SQLite-based task and conversation store.
//!
//! A single database file holds tasks, conversations, and messages. All
//! queries filter by owner so cross-owner access has no code path.

use super::{
    Conversation, ConversationStore, HistoryPage, Message, MessageRole, Task, TaskChanges,
    TaskStore, ToolCallRecord,
};
use crate::error::{GjortError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// SQLite-backed store for tasks and conversations.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        owner TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        completed INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner);

    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        owner TEXT NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_conversations_owner ON conversations(owner);

    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        tool_calls TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_messages_conversation_id ON messages(conversation_id);
    CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);
"#;

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GjortError::Store(format!("Failed to acquire lock: {}", e)))
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn map_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let id_str: String = row.get(0)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(Task {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        owner: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        completed: row.get(4)?,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

fn map_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = row.get(0)?;
    let created_at_str: String = row.get(3)?;
    let updated_at_str: String = row.get(4)?;

    Ok(Conversation {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        owner: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_timestamp(&updated_at_str),
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let conversation_str: String = row.get(1)?;
    let role_str: String = row.get(2)?;
    let tool_calls_json: Option<String> = row.get(4)?;
    let created_at_str: String = row.get(5)?;

    Ok(Message {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        conversation_id: Uuid::parse_str(&conversation_str).unwrap_or_default(),
        role: role_str.parse().unwrap_or(MessageRole::User),
        content: row.get(3)?,
        tool_calls: tool_calls_json.and_then(|json| serde_json::from_str(&json).ok()),
        created_at: parse_timestamp(&created_at_str),
    })
}

const TASK_COLUMNS: &str = "id, owner, title, description, completed, created_at, updated_at";
const CONVERSATION_COLUMNS: &str = "id, owner, title, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, tool_calls, created_at";

#[async_trait]
impl TaskStore for SqliteStore {
    #[instrument(skip(self, description))]
    async fn create_task(
        &self,
        owner: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task> {
        let task = Task::new(
            owner.to_string(),
            title.to_string(),
            description.map(|d| d.to_string()),
        );

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO tasks (id, owner, title, description, completed, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                task.id.to_string(),
                task.owner,
                task.title,
                task.description,
                task.completed,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;

        debug!("Created task {} for {}", task.id, owner);
        Ok(task)
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self, owner: &str) -> Result<Vec<Task>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE owner = ?1 ORDER BY created_at, id",
            TASK_COLUMNS
        ))?;

        let tasks = stmt.query_map(params![owner], map_task)?;
        let result: Vec<Task> = tasks.filter_map(|t| t.ok()).collect();

        debug!("Found {} tasks for {}", result.len(), owner);
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_task(&self, owner: &str, id: Uuid) -> Result<Option<Task>> {
        let conn = self.lock()?;

        let task = conn.query_row(
            &format!(
                "SELECT {} FROM tasks WHERE id = ?1 AND owner = ?2",
                TASK_COLUMNS
            ),
            params![id.to_string(), owner],
            map_task,
        );

        match task {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, changes))]
    async fn update_task(
        &self,
        owner: &str,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>> {
        let Some(mut task) = self.get_task(owner, id).await? else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(completed) = changes.completed {
            task.completed = completed;
        }
        task.updated_at = Utc::now();

        let conn = self.lock()?;
        conn.execute(
            r#"
            UPDATE tasks SET title = ?1, description = ?2, completed = ?3, updated_at = ?4
            WHERE id = ?5 AND owner = ?6
            "#,
            params![
                task.title,
                task.description,
                task.completed,
                task.updated_at.to_rfc3339(),
                task.id.to_string(),
                owner,
            ],
        )?;

        Ok(Some(task))
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, owner: &str, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner = ?2",
            params![id.to_string(), owner],
        )?;

        Ok(deleted > 0)
    }

    #[instrument(skip(self))]
    async fn toggle_completion(&self, owner: &str, id: Uuid) -> Result<Option<Task>> {
        let Some(task) = self.get_task(owner, id).await? else {
            return Ok(None);
        };

        self.update_task(
            owner,
            id,
            TaskChanges {
                completed: Some(!task.completed),
                ..TaskChanges::default()
            },
        )
        .await
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    #[instrument(skip(self))]
    async fn resolve_or_create(&self, owner: &str) -> Result<Conversation> {
        {
            let conn = self.lock()?;
            let existing = conn.query_row(
                &format!(
                    "SELECT {} FROM conversations WHERE owner = ?1 \
                     ORDER BY updated_at DESC, id DESC LIMIT 1",
                    CONVERSATION_COLUMNS
                ),
                params![owner],
                map_conversation,
            );

            match existing {
                Ok(conversation) => return Ok(conversation),
                Err(rusqlite::Error::QueryReturnedNoRows) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let conversation = Conversation::new(owner.to_string());
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO conversations (id, owner, title, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                conversation.id.to_string(),
                conversation.owner,
                conversation.title,
                conversation.created_at.to_rfc3339(),
                conversation.updated_at.to_rfc3339(),
            ],
        )?;

        info!("Created conversation {} for {}", conversation.id, owner);
        Ok(conversation)
    }

    #[instrument(skip(self))]
    async fn get_conversation(&self, owner: &str, id: Uuid) -> Result<Option<Conversation>> {
        let conn = self.lock()?;

        let conversation = conn.query_row(
            &format!(
                "SELECT {} FROM conversations WHERE id = ?1 AND owner = ?2",
                CONVERSATION_COLUMNS
            ),
            params![id.to_string(), owner],
            map_conversation,
        );

        match conversation {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, content, tool_calls))]
    async fn append_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
        tool_calls: Option<&[ToolCallRecord]>,
    ) -> Result<Message> {
        let message = Message::new(
            conversation_id,
            role,
            content.to_string(),
            tool_calls.map(|t| t.to_vec()),
        );

        let tool_calls_json = match &message.tool_calls {
            Some(records) => Some(serde_json::to_string(records)?),
            None => None,
        };

        let conn = self.lock()?;

        // Message insert and conversation bump must land together.
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, tool_calls, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                message.id.to_string(),
                message.conversation_id.to_string(),
                message.role.as_str(),
                message.content,
                tool_calls_json,
                message.created_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            params![
                message.created_at.to_rfc3339(),
                message.conversation_id.to_string()
            ],
        )?;
        tx.commit()?;

        debug!(
            "Appended {} message {} to conversation {}",
            message.role.as_str(),
            message.id,
            conversation_id
        );
        Ok(message)
    }

    #[instrument(skip(self))]
    async fn recent_messages(&self, conversation_id: Uuid, limit: usize) -> Result<Vec<Message>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM messages WHERE conversation_id = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2",
            MESSAGE_COLUMNS
        ))?;

        let messages = stmt.query_map(
            params![conversation_id.to_string(), limit as i64],
            map_message,
        )?;
        let mut result: Vec<Message> = messages.filter_map(|m| m.ok()).collect();

        // Reverse to chronological order (oldest first)
        result.reverse();
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn paginate(
        &self,
        owner: &str,
        conversation_id: Option<Uuid>,
        limit: usize,
        before: Option<Uuid>,
    ) -> Result<HistoryPage> {
        // Resolve the target conversation, ownership-checked.
        let conversation = match conversation_id {
            Some(id) => self.get_conversation(owner, id).await?,
            None => {
                let conn = self.lock()?;
                let existing = conn.query_row(
                    &format!(
                        "SELECT {} FROM conversations WHERE owner = ?1 \
                         ORDER BY updated_at DESC, id DESC LIMIT 1",
                        CONVERSATION_COLUMNS
                    ),
                    params![owner],
                    map_conversation,
                );
                match existing {
                    Ok(c) => Some(c),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let Some(conversation) = conversation else {
            return Ok(HistoryPage {
                conversation_id: None,
                messages: Vec::new(),
                has_more: false,
            });
        };

        // Resolve the cursor message, if supplied and part of this conversation.
        let cursor = match before {
            Some(before_id) => {
                let conn = self.lock()?;
                let found = conn.query_row(
                    &format!(
                        "SELECT {} FROM messages WHERE id = ?1 AND conversation_id = ?2",
                        MESSAGE_COLUMNS
                    ),
                    params![before_id.to_string(), conversation.id.to_string()],
                    map_message,
                );
                match found {
                    Ok(m) => Some(m),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            }
            None => None,
        };

        let conn = self.lock()?;

        // Fetch one extra row to detect whether older messages remain.
        // The cursor compares (created_at, id) so equal timestamps still
        // paginate without gaps or duplicates.
        let mut messages: Vec<Message> = match &cursor {
            Some(cursor_msg) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM messages WHERE conversation_id = ?1 \
                     AND (created_at < ?2 OR (created_at = ?2 AND id < ?3)) \
                     ORDER BY created_at DESC, id DESC LIMIT ?4",
                    MESSAGE_COLUMNS
                ))?;
                let rows = stmt.query_map(
                    params![
                        conversation.id.to_string(),
                        cursor_msg.created_at.to_rfc3339(),
                        cursor_msg.id.to_string(),
                        (limit + 1) as i64
                    ],
                    map_message,
                )?;
                rows.filter_map(|m| m.ok()).collect()
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM messages WHERE conversation_id = ?1 \
                     ORDER BY created_at DESC, id DESC LIMIT ?2",
                    MESSAGE_COLUMNS
                ))?;
                let rows = stmt.query_map(
                    params![conversation.id.to_string(), (limit + 1) as i64],
                    map_message,
                )?;
                rows.filter_map(|m| m.ok()).collect()
            }
        };

        let has_more = messages.len() > limit;
        if has_more {
            messages.truncate(limit);
        }

        // Reverse to chronological order (oldest first)
        messages.reverse();

        Ok(HistoryPage {
            conversation_id: Some(conversation.id),
            messages,
            has_more,
        })
    }
}
