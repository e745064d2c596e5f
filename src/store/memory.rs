//! In-memory task and conversation store.
//!
//! Useful for testing and throwaway sessions.

use super::{
    Conversation, ConversationStore, HistoryPage, Message, MessageRole, Task, TaskChanges,
    TaskStore, ToolCallRecord,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory store backed by RwLock'd maps.
pub struct MemoryStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    conversations: RwLock<HashMap<Uuid, Conversation>>,
    messages: RwLock<Vec<Message>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            conversations: RwLock::new(HashMap::new()),
            messages: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
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
        let mut tasks = self.tasks.write().unwrap();
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, owner: &str) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().unwrap();
        let mut result: Vec<Task> = tasks
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect();
        result.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(result)
    }

    async fn get_task(&self, owner: &str, id: Uuid) -> Result<Option<Task>> {
        let tasks = self.tasks.read().unwrap();
        Ok(tasks.get(&id).filter(|t| t.owner == owner).cloned())
    }

    async fn update_task(
        &self,
        owner: &str,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().unwrap();
        let Some(task) = tasks.get_mut(&id).filter(|t| t.owner == owner) else {
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

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, owner: &str, id: Uuid) -> Result<bool> {
        let mut tasks = self.tasks.write().unwrap();
        match tasks.get(&id) {
            Some(task) if task.owner == owner => {
                tasks.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn toggle_completion(&self, owner: &str, id: Uuid) -> Result<Option<Task>> {
        let completed = {
            let tasks = self.tasks.read().unwrap();
            match tasks.get(&id).filter(|t| t.owner == owner) {
                Some(task) => !task.completed,
                None => return Ok(None),
            }
        };

        self.update_task(
            owner,
            id,
            TaskChanges {
                completed: Some(completed),
                ..TaskChanges::default()
            },
        )
        .await
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn resolve_or_create(&self, owner: &str) -> Result<Conversation> {
        {
            let conversations = self.conversations.read().unwrap();
            if let Some(existing) = conversations
                .values()
                .filter(|c| c.owner == owner)
                .max_by(|a, b| (a.updated_at, a.id).cmp(&(b.updated_at, b.id)))
            {
                return Ok(existing.clone());
            }
        }

        let conversation = Conversation::new(owner.to_string());
        let mut conversations = self.conversations.write().unwrap();
        conversations.insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, owner: &str, id: Uuid) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().unwrap();
        Ok(conversations.get(&id).filter(|c| c.owner == owner).cloned())
    }

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

        // Both writes under the message lock so a concurrent read can't see
        // the message without the bumped conversation.
        let mut messages = self.messages.write().unwrap();
        if let Some(conversation) = self.conversations.write().unwrap().get_mut(&conversation_id) {
            conversation.updated_at = message.created_at;
        }
        messages.push(message.clone());

        Ok(message)
    }

    async fn recent_messages(&self, conversation_id: Uuid, limit: usize) -> Result<Vec<Message>> {
        let messages = self.messages.read().unwrap();
        let mut all: Vec<Message> = messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        all.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        let start = all.len().saturating_sub(limit);
        Ok(all.split_off(start))
    }

    async fn paginate(
        &self,
        owner: &str,
        conversation_id: Option<Uuid>,
        limit: usize,
        before: Option<Uuid>,
    ) -> Result<HistoryPage> {
        let conversation = match conversation_id {
            Some(id) => self.get_conversation(owner, id).await?,
            None => {
                let conversations = self.conversations.read().unwrap();
                conversations
                    .values()
                    .filter(|c| c.owner == owner)
                    .max_by(|a, b| (a.updated_at, a.id).cmp(&(b.updated_at, b.id)))
                    .cloned()
            }
        };

        let Some(conversation) = conversation else {
            return Ok(HistoryPage {
                conversation_id: None,
                messages: Vec::new(),
                has_more: false,
            });
        };

        let messages = self.messages.read().unwrap();
        let mut all: Vec<Message> = messages
            .iter()
            .filter(|m| m.conversation_id == conversation.id)
            .cloned()
            .collect();
        all.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        if let Some(before_id) = before {
            if let Some(cursor) = all.iter().find(|m| m.id == before_id).cloned() {
                all.retain(|m| (m.created_at, m.id) < (cursor.created_at, cursor.id));
            }
        }

        let has_more = all.len() > limit;
        let start = all.len().saturating_sub(limit);
        let page = all.split_off(start);

        Ok(HistoryPage {
            conversation_id: Some(conversation.id),
            messages: page,
            has_more,
        })
    }
}
