//! Completion model abstraction.
//!
//! The agent loop talks to the model through [`CompletionModel`], so its
//! control flow can be exercised against a scripted implementation in tests
//! while production wires in the OpenAI-compatible client.

use super::registry::ToolDefinition;
use crate::config::ModelSettings;
use crate::error::{GjortError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, ChatCompletionToolChoiceOption,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_trait::async_trait;

/// A message in the prompt sent to the model.
#[derive(Debug, Clone)]
pub enum PromptMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<RequestedToolCall>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

/// A tool invocation the model asked for. Arguments arrive as the raw JSON
/// string the model produced, which may be malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// One model turn: a text reply, tool requests, or both.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<RequestedToolCall>,
}

/// Chat completion backend the agent loop drives.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Produce the next turn given the conversation so far and the tools
    /// on offer.
    async fn complete(
        &self,
        messages: &[PromptMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn>;
}

/// Production model backed by an OpenAI-compatible chat completion API.
pub struct OpenAiModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiModel {
    /// Create a model client from settings.
    pub fn new(settings: &ModelSettings) -> Self {
        Self {
            client: create_client(settings.api_base.as_deref()),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiModel {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        if !tools.is_empty() {
            builder
                .tools(tools.iter().map(to_chat_tool).collect::<Vec<_>>())
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let request = builder
            .build()
            .map_err(|e| GjortError::Model(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GjortError::Model(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GjortError::Model("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| RequestedToolCall {
                id: c.id,
                name: c.function.name,
                arguments: c.function.arguments,
            })
            .collect();

        Ok(ModelTurn {
            content: choice.message.content,
            tool_calls,
        })
    }
}

fn to_request_message(message: &PromptMessage) -> Result<ChatCompletionRequestMessage> {
    let built = match message {
        PromptMessage::System { content } => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.clone())
            .build()
            .map(Into::into),
        PromptMessage::User { content } => ChatCompletionRequestUserMessageArgs::default()
            .content(content.clone())
            .build()
            .map(Into::into),
        PromptMessage::Assistant {
            content,
            tool_calls,
        } => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(content) = content {
                builder.content(content.clone());
            }
            if !tool_calls.is_empty() {
                let calls: Vec<ChatCompletionMessageToolCall> = tool_calls
                    .iter()
                    .map(|c| ChatCompletionMessageToolCall {
                        id: c.id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: c.name.clone(),
                            arguments: c.arguments.clone(),
                        },
                    })
                    .collect();
                builder.tool_calls(calls);
            }
            builder.build().map(Into::into)
        }
        PromptMessage::Tool { call_id, content } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(call_id.clone())
            .content(content.clone())
            .build()
            .map(Into::into),
    };

    built.map_err(|e| GjortError::Model(e.to_string()))
}

fn to_chat_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: definition.name.to_string(),
            description: Some(definition.description.to_string()),
            parameters: Some(definition.parameters.clone()),
            strict: None,
        },
    }
}
