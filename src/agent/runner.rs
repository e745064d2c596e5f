//! Agent runner with bounded tool calling loop.

use super::model::{CompletionModel, ModelTurn, PromptMessage, RequestedToolCall};
use super::registry::ToolRegistry;
use super::tools::ToolContext;
use crate::store::{Message, MessageRole, ToolCallRecord};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default system prompt for the task agent.
const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful task management assistant. You help users manage their todo list through natural language conversation.

Your capabilities:
- Create new tasks when users describe what they need to do
- List and show tasks with filtering options
- Update task details (title, description)
- Mark tasks as complete
- Delete tasks (always ask for confirmation first)
- Maintain conversational context across multiple messages

Guidelines:
- Be friendly and conversational
- Extract task details from natural language (e.g., "buy groceries by Friday" becomes title: "Buy groceries")
- Format task lists in a readable way with numbers (1, 2, 3...)
- Never expose raw errors, translate them into friendly messages
- When showing tasks, include their status (pending/completed) and any relevant details

Handling task references:
When users refer to tasks by number (e.g., "task 2", "the second one", "number 1"):
1. Check whether you recently called list_tasks and look at the previous tool results in this conversation
2. If you have a recent list, map the number to the task_id at that position in the list
3. Use that task_id for update_task, complete_task, or delete_task
4. If you do not have a recent list, call list_tasks first, then perform the requested action

Error handling:
- If a task is not found, suggest showing the task list
- If input is unclear, ask clarifying questions
- Keep error messages user-friendly and actionable"#;

/// Reply when the model produces neither text nor tool calls.
const FALLBACK_REPLY: &str = "I'm not sure how to help with that.";

/// Reply when the iteration ceiling is hit while the model still wants tools.
const CEILING_REPLY: &str = "I've completed the requested actions.";

/// Reply when the model backend fails mid-run.
const APOLOGY_REPLY: &str =
    "I encountered an error while processing your request. Please try again.";

/// Default iteration ceiling for one run.
const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Why an agent run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model produced a final text reply without requesting tools.
    Completed,
    /// The iteration ceiling was reached while the model still wanted tools.
    IterationLimit,
    /// The model backend failed; the user gets an apology.
    ModelFault,
}

/// Outcome of one agent run. Runs never fail outright: faults degrade to an
/// apologetic reply so the conversation stays usable.
#[derive(Debug)]
pub struct AgentOutcome {
    /// The assistant's reply text.
    pub reply: String,
    /// Every tool invocation made, in execution order, faults included.
    pub ledger: Vec<ToolCallRecord>,
    /// Number of model calls made.
    pub iterations: usize,
    /// Why the run stopped.
    pub stop: StopReason,
}

/// Conversational agent that manages tasks through tool calls.
pub struct Agent {
    model: Arc<dyn CompletionModel>,
    registry: ToolRegistry,
    tools: ToolContext,
    max_iterations: usize,
    system_prompt: String,
}

impl Agent {
    /// Create a new agent.
    pub fn new(model: Arc<dyn CompletionModel>, registry: ToolRegistry, tools: ToolContext) -> Self {
        Self {
            model,
            registry,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the iteration ceiling for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Run the agent for one user message.
    ///
    /// `history` is prior conversation context in chronological order; the
    /// new `user_message` is appended after it. Tool calls execute
    /// sequentially in the order the model requested them.
    pub async fn run(&self, owner: &str, history: &[Message], user_message: &str) -> AgentOutcome {
        let mut messages: Vec<PromptMessage> = Vec::with_capacity(history.len() + 2);
        messages.push(PromptMessage::System {
            content: self.system_prompt.clone(),
        });
        for message in history {
            messages.push(match message.role {
                MessageRole::User => PromptMessage::User {
                    content: message.content.clone(),
                },
                MessageRole::Assistant => PromptMessage::Assistant {
                    content: Some(message.content.clone()),
                    tool_calls: Vec::new(),
                },
            });
        }
        messages.push(PromptMessage::User {
            content: user_message.to_string(),
        });

        let definitions = self.registry.definitions();
        let mut ledger = Vec::new();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            debug!("Agent iteration {}", iterations);

            let turn = match self.model.complete(&messages, &definitions).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!("Model call failed on iteration {}: {}", iterations, e);
                    return AgentOutcome {
                        reply: APOLOGY_REPLY.to_string(),
                        ledger,
                        iterations,
                        stop: StopReason::ModelFault,
                    };
                }
            };

            if turn.tool_calls.is_empty() {
                return AgentOutcome {
                    reply: final_reply(&turn),
                    ledger,
                    iterations,
                    stop: StopReason::Completed,
                };
            }

            messages.push(PromptMessage::Assistant {
                content: turn.content.clone(),
                tool_calls: turn.tool_calls.clone(),
            });

            for call in &turn.tool_calls {
                let (record, feedback) = self.execute_tool_call(owner, call).await;
                messages.push(PromptMessage::Tool {
                    call_id: call.id.clone(),
                    content: feedback,
                });
                ledger.push(record);
            }
        }

        AgentOutcome {
            reply: CEILING_REPLY.to_string(),
            ledger,
            iterations,
            stop: StopReason::IterationLimit,
        }
    }

    /// Execute one requested tool call, returning the ledger record and the
    /// serialized result to feed back to the model.
    async fn execute_tool_call(
        &self,
        owner: &str,
        call: &RequestedToolCall,
    ) -> (ToolCallRecord, String) {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);

        // Malformed argument JSON becomes a validation error the model can
        // read and retry from, not a run failure.
        let (input, result) = match serde_json::from_str::<Value>(&call.arguments) {
            Ok(args) => {
                let result = self
                    .registry
                    .invoke(&self.tools, owner, &call.name, &args)
                    .await;
                (args, result.to_value())
            }
            Err(e) => {
                let result = serde_json::json!({
                    "status": "error",
                    "error": {
                        "type": "validation_error",
                        "message": format!("Invalid tool arguments: {}", e),
                    }
                });
                (Value::String(call.arguments.clone()), result)
            }
        };

        let feedback = result.to_string();
        let record = ToolCallRecord {
            tool: call.name.clone(),
            input,
            result,
        };
        (record, feedback)
    }
}

fn final_reply(turn: &ModelTurn) -> String {
    match turn.content.as_deref() {
        Some(content) if !content.trim().is_empty() => content.to_string(),
        _ => FALLBACK_REPLY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::model::CompletionModel;
    use crate::agent::registry::ToolDefinition;
    use crate::error::{GjortError, Result};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted model: plays back a fixed sequence of turns.
    struct ScriptedModel {
        turns: Mutex<Vec<Result<ModelTurn>>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<Result<ModelTurn>>) -> Self {
            Self {
                turns: Mutex::new(turns),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(
            &self,
            _messages: &[PromptMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ModelTurn> {
            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() {
                return Err(GjortError::Model("Script exhausted".to_string()));
            }
            turns.remove(0)
        }
    }

    fn text_turn(content: &str) -> Result<ModelTurn> {
        Ok(ModelTurn {
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
        })
    }

    fn tool_turn(calls: Vec<(&str, &str, &str)>) -> Result<ModelTurn> {
        Ok(ModelTurn {
            content: None,
            tool_calls: calls
                .into_iter()
                .map(|(id, name, args)| RequestedToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments: args.to_string(),
                })
                .collect(),
        })
    }

    fn agent_with(turns: Vec<Result<ModelTurn>>) -> Agent {
        let store = Arc::new(MemoryStore::new());
        Agent::new(
            Arc::new(ScriptedModel::new(turns)),
            ToolRegistry::with_builtin_tools(),
            ToolContext::new(store),
        )
    }

    #[tokio::test]
    async fn test_plain_reply_no_tools() {
        let agent = agent_with(vec![text_turn("Hello! How can I help?")]);
        let outcome = agent.run("alice", &[], "hi").await;

        assert_eq!(outcome.reply, "Hello! How can I help?");
        assert_eq!(outcome.stop, StopReason::Completed);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_empty_turn_falls_back() {
        let agent = agent_with(vec![Ok(ModelTurn::default())]);
        let outcome = agent.run("alice", &[], "hi").await;

        assert_eq!(outcome.reply, FALLBACK_REPLY);
        assert_eq!(outcome.stop, StopReason::Completed);
    }

    #[tokio::test]
    async fn test_tool_call_then_reply() {
        let agent = agent_with(vec![
            tool_turn(vec![("call_1", "add_task", r#"{"title": "Buy milk"}"#)]),
            text_turn("Added \"Buy milk\" to your list."),
        ]);
        let outcome = agent.run("alice", &[], "remind me to buy milk").await;

        assert_eq!(outcome.stop, StopReason::Completed);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.ledger.len(), 1);
        assert_eq!(outcome.ledger[0].tool, "add_task");
        assert_eq!(outcome.ledger[0].result["status"], "created");
    }

    #[tokio::test]
    async fn test_iteration_ceiling() {
        // The model requests a tool on every turn, never concluding.
        let turns = (0..10)
            .map(|_| tool_turn(vec![("call_x", "list_tasks", "{}")]))
            .collect();
        let agent = agent_with(turns);
        let outcome = agent.run("alice", &[], "loop forever").await;

        assert_eq!(outcome.stop, StopReason::IterationLimit);
        assert_eq!(outcome.iterations, 5);
        assert_eq!(outcome.ledger.len(), 5);
        assert_eq!(outcome.reply, CEILING_REPLY);
    }

    #[tokio::test]
    async fn test_model_fault_keeps_partial_ledger() {
        let agent = agent_with(vec![
            tool_turn(vec![("call_1", "add_task", r#"{"title": "Buy milk"}"#)]),
            Err(GjortError::Model("upstream 500".to_string())),
        ]);
        let outcome = agent.run("alice", &[], "remind me to buy milk").await;

        assert_eq!(outcome.stop, StopReason::ModelFault);
        assert_eq!(outcome.reply, APOLOGY_REPLY);
        assert_eq!(outcome.ledger.len(), 1);
        assert_eq!(outcome.ledger[0].result["status"], "created");
    }

    #[tokio::test]
    async fn test_malformed_arguments_recorded_and_recoverable() {
        let agent = agent_with(vec![
            tool_turn(vec![("call_1", "add_task", "{not json")]),
            text_turn("Sorry, something went odd. Could you rephrase?"),
        ]);
        let outcome = agent.run("alice", &[], "add a task").await;

        assert_eq!(outcome.stop, StopReason::Completed);
        assert_eq!(outcome.ledger.len(), 1);
        assert_eq!(outcome.ledger[0].result["error"]["type"], "validation_error");
    }
}
