//! End-to-end tests for the chat flow: scripted model turns driving real
//! tool execution against an in-memory store.

use async_trait::async_trait;
use gjort::agent::{
    CompletionModel, ModelTurn, PromptMessage, RequestedToolCall, ToolDefinition,
};
use gjort::chat::ChatService;
use gjort::config::Settings;
use gjort::error::{GjortError, Result};
use gjort::store::{MemoryStore, TaskStore};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// One scripted model step.
enum Step {
    /// Reply with text and stop.
    Text(&'static str),
    /// Request a single tool call with fixed arguments.
    Tool(&'static str, String),
    /// Request a tool call whose arguments are derived from the most recent
    /// tool result in the prompt, mimicking reference resolution.
    ToolFromLastResult(&'static str, fn(&Value) -> String),
    /// Reply with text derived from the most recent tool result and stop.
    TextFromLastResult(fn(&Value) -> String),
    /// Request a tool call whose arguments are derived from the full prompt,
    /// mimicking reference resolution over replayed history.
    ToolFromHistory(&'static str, fn(&[PromptMessage]) -> String),
    /// Fail the model call.
    Fault(&'static str),
}

struct ScriptedModel {
    steps: Mutex<Vec<Step>>,
}

impl ScriptedModel {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps),
        })
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ModelTurn> {
        let mut steps = self.steps.lock().unwrap();
        if steps.is_empty() {
            return Err(GjortError::Model("Script exhausted".to_string()));
        }

        match steps.remove(0) {
            Step::Text(content) => Ok(ModelTurn {
                content: Some(content.to_string()),
                tool_calls: Vec::new(),
            }),
            Step::Tool(name, arguments) => Ok(tool_request(name, arguments)),
            Step::ToolFromLastResult(name, derive) => {
                Ok(tool_request(name, derive(&last_tool_result(messages))))
            }
            Step::TextFromLastResult(derive) => Ok(ModelTurn {
                content: Some(derive(&last_tool_result(messages))),
                tool_calls: Vec::new(),
            }),
            Step::ToolFromHistory(name, derive) => Ok(tool_request(name, derive(messages))),
            Step::Fault(reason) => Err(GjortError::Model(reason.to_string())),
        }
    }
}

fn last_tool_result(messages: &[PromptMessage]) -> Value {
    messages
        .iter()
        .rev()
        .find_map(|m| match m {
            PromptMessage::Tool { content, .. } => serde_json::from_str::<Value>(content).ok(),
            _ => None,
        })
        .expect("script expects a prior tool result")
}

fn tool_request(name: &str, arguments: String) -> ModelTurn {
    ModelTurn {
        content: None,
        tool_calls: vec![RequestedToolCall {
            id: format!("call_{}", name),
            name: name.to_string(),
            arguments,
        }],
    }
}

fn harness(steps: Vec<Step>) -> (ChatService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = ChatService::with_components(
        ScriptedModel::new(steps),
        store.clone(),
        store.clone(),
        &Settings::default(),
    );
    (service, store)
}

#[tokio::test]
async fn create_task_through_chat() {
    let (service, store) = harness(vec![
        Step::Tool("add_task", r#"{"title": "Buy milk"}"#.to_string()),
        Step::Text("Added \"Buy milk\" to your list."),
    ]);

    let reply = service
        .send_message("alice", None, "remind me to buy milk")
        .await
        .unwrap();

    assert_eq!(reply.message.content, "Added \"Buy milk\" to your list.");

    // One ledger entry, recorded on the assistant message
    let ledger = reply.message.tool_calls.as_ref().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].tool, "add_task");
    assert_eq!(ledger[0].result["status"], "created");

    // And the task actually exists
    let tasks = store.list_tasks("alice").await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");
    assert_eq!(tasks[0].description, None);
    assert!(!tasks[0].completed);
}

#[tokio::test]
async fn complete_task_by_reference() {
    let (service, store) = harness(vec![
        Step::Tool("list_tasks", "{}".to_string()),
        Step::ToolFromLastResult("complete_task", |list| {
            // "the second one"
            let id = list["tasks"][1]["id"].as_str().unwrap();
            format!(r#"{{"task_id": "{}"}}"#, id)
        }),
        Step::Text("Marked the second task as done."),
    ]);

    let first = store.create_task("alice", "Buy milk", None).await.unwrap();
    let second = store.create_task("alice", "Walk dog", None).await.unwrap();

    let reply = service
        .send_message("alice", None, "finish the second one")
        .await
        .unwrap();

    let ledger = reply.message.tool_calls.as_ref().unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0].tool, "list_tasks");
    assert_eq!(ledger[1].tool, "complete_task");
    assert_eq!(
        ledger[1].input["task_id"].as_str().unwrap(),
        second.id.to_string()
    );

    let second = store.get_task("alice", second.id).await.unwrap().unwrap();
    assert!(second.completed);
    let first = store.get_task("alice", first.id).await.unwrap().unwrap();
    assert!(!first.completed);
}

#[tokio::test]
async fn complete_task_by_reference_across_turns() {
    let (service, store) = harness(vec![
        // First turn: "list my tasks"
        Step::Tool("list_tasks", "{}".to_string()),
        Step::TextFromLastResult(|list| {
            format!(
                "1. Buy milk (task-id: {})",
                list["tasks"][0]["id"].as_str().unwrap()
            )
        }),
        // Second turn: "mark the first one complete" resolved purely from
        // the replayed history, no fresh listing
        Step::ToolFromHistory("complete_task", |messages| {
            let id = messages
                .iter()
                .rev()
                .find_map(|m| match m {
                    PromptMessage::Assistant {
                        content: Some(c), ..
                    } => c
                        .split("task-id: ")
                        .nth(1)
                        .map(|rest| rest.trim_end_matches(')').to_string()),
                    _ => None,
                })
                .expect("history should replay the first turn's reply");
            format!(r#"{{"task_id": "{}"}}"#, id)
        }),
        Step::Text("Done, marked \"Buy milk\" complete."),
    ]);

    let task = store.create_task("alice", "Buy milk", None).await.unwrap();

    let first = service
        .send_message("alice", None, "list my tasks")
        .await
        .unwrap();
    assert!(first.message.content.contains(&task.id.to_string()));

    let second = service
        .send_message("alice", None, "mark the first one complete")
        .await
        .unwrap();

    // Same conversation carried the context across turns
    assert_eq!(first.conversation_id, second.conversation_id);

    // Exactly one tool call in the second turn, aimed at the task from the
    // first turn's list result
    let ledger = second.message.tool_calls.as_ref().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].tool, "complete_task");
    assert_eq!(
        ledger[0].input["task_id"].as_str().unwrap(),
        task.id.to_string()
    );

    let task = store.get_task("alice", task.id).await.unwrap().unwrap();
    assert!(task.completed);
}

#[tokio::test]
async fn runaway_model_hits_iteration_ceiling() {
    // The script never produces a final text turn
    let steps = (0..20)
        .map(|_| Step::Tool("list_tasks", "{}".to_string()))
        .collect();
    let (service, _store) = harness(steps);

    let reply = service
        .send_message("alice", None, "keep going forever")
        .await
        .unwrap();

    assert_eq!(reply.message.content, "I've completed the requested actions.");
    // One tool call per iteration, capped at the default ceiling
    assert_eq!(reply.message.tool_calls.as_ref().unwrap().len(), 5);
}

#[tokio::test]
async fn model_fault_degrades_to_apology() {
    let (service, store) = harness(vec![
        Step::Tool("add_task", r#"{"title": "Buy milk"}"#.to_string()),
        Step::Fault("upstream 500"),
    ]);

    let reply = service
        .send_message("alice", None, "remind me to buy milk")
        .await
        .unwrap();

    assert_eq!(
        reply.message.content,
        "I encountered an error while processing your request. Please try again."
    );

    // The tool call that happened before the fault is still on the record,
    // and its side effect persists.
    let ledger = reply.message.tool_calls.as_ref().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(store.list_tasks("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn owners_see_only_their_own_tasks() {
    let (service, store) = harness(vec![
        Step::Tool("list_tasks", "{}".to_string()),
        Step::Text("You have one task: Walk dog."),
    ]);

    store.create_task("alice", "Buy milk", None).await.unwrap();
    store.create_task("bob", "Walk dog", None).await.unwrap();

    let reply = service
        .send_message("bob", None, "what's on my list?")
        .await
        .unwrap();

    let ledger = reply.message.tool_calls.as_ref().unwrap();
    assert_eq!(ledger[0].result["count"], 1);
    assert_eq!(ledger[0].result["tasks"][0]["title"], "Walk dog");
}

#[tokio::test]
async fn conversations_are_isolated_per_owner() {
    let (service, _store) = harness(vec![
        Step::Text("Hi Alice."),
        Step::Text("Hi Bob."),
    ]);

    let alice = service.send_message("alice", None, "hello").await.unwrap();
    let bob = service.send_message("bob", None, "hello").await.unwrap();

    assert_ne!(alice.conversation_id, bob.conversation_id);

    let alice_page = service.get_history("alice", None, None, None).await.unwrap();
    assert_eq!(alice_page.conversation_id, Some(alice.conversation_id));
    assert_eq!(alice_page.messages.len(), 2);
    assert_eq!(alice_page.messages[1].content, "Hi Alice.");
}
