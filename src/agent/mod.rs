//! Conversational agent for natural-language task management.
//!
//! The agent drives a bounded tool calling loop: the model reads the
//! conversation, requests task tools, and the loop feeds structured results
//! back until the model produces a final reply or hits the iteration
//! ceiling.

mod model;
mod registry;
mod runner;
mod tools;

pub use model::{CompletionModel, ModelTurn, OpenAiModel, PromptMessage, RequestedToolCall};
pub use registry::{ToolDefinition, ToolRegistry};
pub use runner::{Agent, AgentOutcome, StopReason};
pub use tools::{
    parse_tool_call, StatusFilter, ToolCall, ToolContext, ToolError, ToolErrorKind, ToolKind,
    ToolResult,
};
