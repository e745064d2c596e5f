//! Chat service: conversation lifecycle around the agent loop.
//!
//! Validates user input, resolves the target conversation, feeds prior
//! context to the agent, and persists both sides of the exchange.

use crate::agent::{Agent, CompletionModel, OpenAiModel, ToolContext, ToolRegistry};
use crate::config::Settings;
use crate::error::{GjortError, Result};
use crate::store::{
    ConversationStore, HistoryPage, Message, MessageRole, MemoryStore, SqliteStore, TaskStore,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Maximum user message length.
const MAX_MESSAGE_LEN: usize = 2000;

/// Maximum history page size.
const MAX_HISTORY_LIMIT: usize = 100;

/// Open the task and conversation stores named by the settings. Both views
/// share one backing store.
pub fn open_stores(
    settings: &Settings,
) -> Result<(Arc<dyn TaskStore>, Arc<dyn ConversationStore>)> {
    match settings.store.provider.as_str() {
        "sqlite" => {
            let store = Arc::new(SqliteStore::new(&settings.sqlite_path())?);
            Ok((store.clone(), store))
        }
        "memory" => {
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone(), store))
        }
        other => Err(GjortError::Config(format!(
            "Unknown store provider: {}",
            other
        ))),
    }
}

/// The assistant's reply to one user message.
#[derive(Debug)]
pub struct ChatReply {
    /// Conversation the exchange was recorded in.
    pub conversation_id: Uuid,
    /// The persisted assistant message, tool call ledger included.
    pub message: Message,
}

/// Service wiring stores and the agent into one conversational surface.
pub struct ChatService {
    tasks: Arc<dyn TaskStore>,
    conversations: Arc<dyn ConversationStore>,
    agent: Agent,
    context_messages: usize,
    history_page_size: usize,
}

impl ChatService {
    /// Build a service from settings, wiring the configured store and the
    /// OpenAI-compatible model.
    pub fn new(settings: &Settings) -> Result<Self> {
        let (tasks, conversations) = open_stores(settings)?;
        let model = Arc::new(OpenAiModel::new(&settings.model));
        Ok(Self::with_components(model, tasks, conversations, settings))
    }

    /// Build a service from explicit components. This is the seam tests use
    /// to drive the full message flow against a scripted model.
    pub fn with_components(
        model: Arc<dyn CompletionModel>,
        tasks: Arc<dyn TaskStore>,
        conversations: Arc<dyn ConversationStore>,
        settings: &Settings,
    ) -> Self {
        let agent = Agent::new(
            model,
            ToolRegistry::with_builtin_tools(),
            ToolContext::new(tasks.clone()),
        )
        .with_max_iterations(settings.chat.max_iterations);

        Self {
            tasks,
            conversations,
            agent,
            context_messages: settings.chat.context_messages,
            history_page_size: settings.chat.history_page_size,
        }
    }

    /// The task store behind this service, for direct (non-conversational)
    /// task operations.
    pub fn tasks(&self) -> &Arc<dyn TaskStore> {
        &self.tasks
    }

    /// Send one user message through the agent and persist the exchange.
    ///
    /// With an explicit `conversation_id` the conversation must exist and
    /// belong to `owner`; without one, the owner's most recent conversation
    /// is used, or a fresh one is created.
    pub async fn send_message(
        &self,
        owner: &str,
        conversation_id: Option<Uuid>,
        message: &str,
    ) -> Result<ChatReply> {
        let length = message.chars().count();
        if length == 0 || length > MAX_MESSAGE_LEN {
            return Err(GjortError::InvalidInput(format!(
                "Message must be between 1 and {} characters",
                MAX_MESSAGE_LEN
            )));
        }

        let conversation = match conversation_id {
            Some(id) => self
                .conversations
                .get_conversation(owner, id)
                .await?
                .ok_or_else(|| GjortError::ConversationNotFound(id.to_string()))?,
            None => self.conversations.resolve_or_create(owner).await?,
        };

        debug!("Sending message in conversation {}", conversation.id);

        // Context is loaded before the new message is appended, so the
        // user's utterance appears in the prompt exactly once.
        let history = self
            .conversations
            .recent_messages(conversation.id, self.context_messages.saturating_sub(1))
            .await?;

        self.conversations
            .append_message(conversation.id, MessageRole::User, message, None)
            .await?;

        let outcome = self.agent.run(owner, &history, message).await;

        let tool_calls = if outcome.ledger.is_empty() {
            None
        } else {
            Some(outcome.ledger.as_slice())
        };

        let assistant = self
            .conversations
            .append_message(
                conversation.id,
                MessageRole::Assistant,
                &outcome.reply,
                tool_calls,
            )
            .await?;

        Ok(ChatReply {
            conversation_id: conversation.id,
            message: assistant,
        })
    }

    /// Fetch a page of conversation history, newest page first but ordered
    /// chronologically within the page.
    pub async fn get_history(
        &self,
        owner: &str,
        conversation_id: Option<Uuid>,
        limit: Option<usize>,
        before: Option<Uuid>,
    ) -> Result<HistoryPage> {
        let limit = limit.unwrap_or(self.history_page_size);
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(GjortError::InvalidInput(format!(
                "Limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }

        let page = self
            .conversations
            .paginate(owner, conversation_id, limit, before)
            .await?;

        // An explicit conversation that didn't resolve is the caller's
        // error, not an empty history.
        if let (Some(id), None) = (conversation_id, page.conversation_id) {
            return Err(GjortError::ConversationNotFound(id.to_string()));
        }

        Ok(page)
    }
}
