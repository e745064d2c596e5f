//! Task and conversation storage abstraction for Gjort.
//!
//! Provides trait-based interfaces for the two stores the agent core
//! depends on, plus the entities they persist.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's task item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID.
    pub id: Uuid,
    /// Owner identity. Every store operation filters on this.
    pub owner: String,
    /// Task title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Completion status.
    pub completed: bool,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(owner: String, title: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            title,
            description,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied to a task. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// A chat conversation between a user and the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID.
    pub id: Uuid,
    /// Owner identity.
    pub owner: String,
    /// Conversation title (placeholder until something better exists).
    pub title: String,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// When a message was last appended.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation with the placeholder title.
    pub fn new(owner: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner,
            title: "New Conversation".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(format!("Unknown message role: {}", s)),
        }
    }
}

/// Record of one tool invocation made while producing an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub tool: String,
    /// Arguments the model supplied.
    pub input: serde_json::Value,
    /// Structured result the tool returned.
    pub result: serde_json::Value,
}

/// A single message in a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID.
    pub id: Uuid,
    /// Conversation this message belongs to.
    pub conversation_id: Uuid,
    /// Message role.
    pub role: MessageRole,
    /// Message text content.
    pub content: String,
    /// Tool invocations made for this message (assistant turns only).
    pub tool_calls: Option<Vec<ToolCallRecord>>,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message.
    pub fn new(
        conversation_id: Uuid,
        role: MessageRole,
        content: String,
        tool_calls: Option<Vec<ToolCallRecord>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content,
            tool_calls,
            created_at: Utc::now(),
        }
    }
}

/// One page of conversation history.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// The conversation the page belongs to, if one exists.
    pub conversation_id: Option<Uuid>,
    /// Messages in chronological order.
    pub messages: Vec<Message>,
    /// Whether older messages exist beyond this page.
    pub has_more: bool,
}

/// Trait for owner-scoped task storage.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task for the owner.
    async fn create_task(
        &self,
        owner: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task>;

    /// List all of the owner's tasks, oldest first.
    async fn list_tasks(&self, owner: &str) -> Result<Vec<Task>>;

    /// Get one task. `None` if absent or owned by someone else.
    async fn get_task(&self, owner: &str, id: Uuid) -> Result<Option<Task>>;

    /// Apply a partial update. `None` if absent or owned by someone else.
    async fn update_task(&self, owner: &str, id: Uuid, changes: TaskChanges)
        -> Result<Option<Task>>;

    /// Delete a task. Returns false if absent or owned by someone else.
    async fn delete_task(&self, owner: &str, id: Uuid) -> Result<bool>;

    /// Flip a task's completion status.
    async fn toggle_completion(&self, owner: &str, id: Uuid) -> Result<Option<Task>>;
}

/// Trait for owner-scoped conversation storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Return the owner's most-recently-updated conversation, creating one
    /// with a placeholder title if none exists.
    async fn resolve_or_create(&self, owner: &str) -> Result<Conversation>;

    /// Get one conversation. `None` if absent or owned by someone else.
    async fn get_conversation(&self, owner: &str, id: Uuid) -> Result<Option<Conversation>>;

    /// Append a message and bump the conversation's `updated_at` atomically.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
        tool_calls: Option<&[ToolCallRecord]>,
    ) -> Result<Message>;

    /// The most recent `limit` messages in chronological order.
    async fn recent_messages(&self, conversation_id: Uuid, limit: usize) -> Result<Vec<Message>>;

    /// Paginated history for an owner. Resolves the target conversation
    /// (explicit, ownership-checked, or most-recent), fetches one row past
    /// `limit` to detect `has_more`, and filters to messages strictly before
    /// the `before` cursor message.
    async fn paginate(
        &self,
        owner: &str,
        conversation_id: Option<Uuid>,
        limit: usize,
        before: Option<Uuid>,
    ) -> Result<HistoryPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("alice".to_string(), "Buy milk".to_string(), None);
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("user".parse::<MessageRole>().unwrap(), MessageRole::User);
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
        assert!("tool".parse::<MessageRole>().is_err());
    }
}
