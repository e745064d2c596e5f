//! Tool definitions and implementations for the task agent.

use crate::store::{TaskChanges, TaskStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Maximum task title length.
const MAX_TITLE_LEN: usize = 500;
/// Maximum task description length.
const MAX_DESCRIPTION_LEN: usize = 5000;

/// Identifier for each tool the registry can dispatch to.
///
/// Dispatch is keyed on this enum rather than the raw tool name string, so
/// a registered tool is statically bound to its argument parser and handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    AddTask,
    ListTasks,
    GetTask,
    UpdateTask,
    CompleteTask,
    DeleteTask,
}

impl ToolKind {
    /// All tools, in the order they are offered to the model.
    pub const ALL: [ToolKind; 6] = [
        ToolKind::AddTask,
        ToolKind::ListTasks,
        ToolKind::GetTask,
        ToolKind::UpdateTask,
        ToolKind::CompleteTask,
        ToolKind::DeleteTask,
    ];

    /// The wire name the model uses to request this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::AddTask => "add_task",
            ToolKind::ListTasks => "list_tasks",
            ToolKind::GetTask => "get_task",
            ToolKind::UpdateTask => "update_task",
            ToolKind::CompleteTask => "complete_task",
            ToolKind::DeleteTask => "delete_task",
        }
    }

    /// Human-readable description offered to the model.
    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::AddTask => "Create a new task for the user",
            ToolKind::ListTasks => "List the user's tasks with optional status filtering",
            ToolKind::GetTask => "Get a specific task by ID",
            ToolKind::UpdateTask => "Update a task's title or description",
            ToolKind::CompleteTask => "Mark a task as complete",
            ToolKind::DeleteTask => "Delete a task permanently",
        }
    }

    /// JSON Schema for the tool's arguments.
    ///
    /// The owner identity is deliberately absent from every schema: it is
    /// injected from the authenticated context, never supplied by the model.
    pub fn parameters(&self) -> Value {
        match self {
            ToolKind::AddTask => json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Task title (1-500 characters)",
                        "minLength": 1,
                        "maxLength": 500
                    },
                    "description": {
                        "type": "string",
                        "description": "Task description (optional, max 5000 characters)",
                        "maxLength": 5000
                    }
                },
                "required": ["title"]
            }),
            ToolKind::ListTasks => json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["all", "pending", "completed"],
                        "description": "Filter by status: 'all' shows all tasks, 'pending' shows incomplete tasks, 'completed' shows finished tasks (default: all)",
                        "default": "all"
                    }
                },
                "required": []
            }),
            ToolKind::GetTask => json!({
                "type": "object",
                "properties": {
                    "task_id": {
                        "type": "string",
                        "description": "Task ID to retrieve"
                    }
                },
                "required": ["task_id"]
            }),
            ToolKind::UpdateTask => json!({
                "type": "object",
                "properties": {
                    "task_id": {
                        "type": "string",
                        "description": "Task ID to update"
                    },
                    "title": {
                        "type": "string",
                        "description": "New task title (optional)",
                        "maxLength": 500
                    },
                    "description": {
                        "type": "string",
                        "description": "New task description (optional)",
                        "maxLength": 5000
                    }
                },
                "required": ["task_id"]
            }),
            ToolKind::CompleteTask => json!({
                "type": "object",
                "properties": {
                    "task_id": {
                        "type": "string",
                        "description": "Task ID to mark as complete"
                    }
                },
                "required": ["task_id"]
            }),
            ToolKind::DeleteTask => json!({
                "type": "object",
                "properties": {
                    "task_id": {
                        "type": "string",
                        "description": "Task ID to delete"
                    }
                },
                "required": ["task_id"]
            }),
        }
    }
}

/// Status filter for task listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "completed" => Ok(StatusFilter::Completed),
            _ => Err(format!(
                "status must be 'all', 'pending', or 'completed', got '{}'",
                s
            )),
        }
    }
}

/// A validated tool invocation with typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    AddTask {
        title: String,
        description: Option<String>,
    },
    ListTasks {
        status: StatusFilter,
    },
    GetTask {
        task_id: String,
    },
    UpdateTask {
        task_id: String,
        title: Option<String>,
        description: Option<String>,
    },
    CompleteTask {
        task_id: String,
    },
    DeleteTask {
        task_id: String,
    },
}

/// Error kinds a tool can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    ValidationError,
    NotFound,
    ExecutionError,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::ValidationError => "validation_error",
            ToolErrorKind::NotFound => "not_found",
            ToolErrorKind::ExecutionError => "execution_error",
        }
    }
}

/// A structured tool error. Never raised past the tool boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::ValidationError,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::ExecutionError,
            message: message.into(),
        }
    }
}

/// Result of a tool invocation: structured data either way.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Value),
    Error(ToolError),
}

impl ToolResult {
    /// The wire shape fed back to the model and stored in the ledger.
    pub fn to_value(&self) -> Value {
        match self {
            ToolResult::Success(payload) => payload.clone(),
            ToolResult::Error(e) => json!({
                "status": "error",
                "error": {
                    "type": e.kind.as_str(),
                    "message": e.message,
                }
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }
}

/// Parse and validate raw tool arguments into a typed call.
pub fn parse_tool_call(kind: ToolKind, args: &Value) -> std::result::Result<ToolCall, ToolError> {
    match kind {
        ToolKind::AddTask => {
            let title = require_str(args, "title")?;
            validate_title(title)?;
            let description = optional_str(args, "description")?;
            validate_description(description)?;
            Ok(ToolCall::AddTask {
                title: title.to_string(),
                description: description.map(|d| d.to_string()),
            })
        }
        ToolKind::ListTasks => {
            let status = match optional_str(args, "status")? {
                Some(s) => s.parse().map_err(ToolError::validation)?,
                None => StatusFilter::All,
            };
            Ok(ToolCall::ListTasks { status })
        }
        ToolKind::GetTask => Ok(ToolCall::GetTask {
            task_id: require_str(args, "task_id")?.to_string(),
        }),
        ToolKind::UpdateTask => {
            let task_id = require_str(args, "task_id")?.to_string();
            let title = optional_str(args, "title")?;
            if let Some(t) = title {
                validate_title(t)?;
            }
            let description = optional_str(args, "description")?;
            validate_description(description)?;
            Ok(ToolCall::UpdateTask {
                task_id,
                title: title.map(|t| t.to_string()),
                description: description.map(|d| d.to_string()),
            })
        }
        ToolKind::CompleteTask => Ok(ToolCall::CompleteTask {
            task_id: require_str(args, "task_id")?.to_string(),
        }),
        ToolKind::DeleteTask => Ok(ToolCall::DeleteTask {
            task_id: require_str(args, "task_id")?.to_string(),
        }),
    }
}

fn require_str<'a>(args: &'a Value, field: &str) -> std::result::Result<&'a str, ToolError> {
    args[field]
        .as_str()
        .ok_or_else(|| ToolError::validation(format!("Missing '{}' argument", field)))
}

fn optional_str<'a>(
    args: &'a Value,
    field: &str,
) -> std::result::Result<Option<&'a str>, ToolError> {
    match &args[field] {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.as_str())),
        _ => Err(ToolError::validation(format!(
            "'{}' argument must be a string",
            field
        ))),
    }
}

fn validate_title(title: &str) -> std::result::Result<(), ToolError> {
    if title.is_empty() {
        return Err(ToolError::validation("Title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ToolError::validation(format!(
            "Title exceeds {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> std::result::Result<(), ToolError> {
    if let Some(d) = description {
        if d.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ToolError::validation(format!(
                "Description exceeds {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
    }
    Ok(())
}

/// Tool execution context with access to the task store.
pub struct ToolContext {
    tasks: Arc<dyn TaskStore>,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }

    /// Execute a validated tool call for the given owner.
    ///
    /// The owner comes from the invoking context, never from model-supplied
    /// arguments. Store faults are captured here and surfaced as
    /// `execution_error` results rather than propagated.
    pub async fn execute(&self, call: &ToolCall, owner: &str) -> ToolResult {
        let outcome = match call {
            ToolCall::AddTask { title, description } => {
                self.execute_add(owner, title, description.as_deref()).await
            }
            ToolCall::ListTasks { status } => self.execute_list(owner, *status).await,
            ToolCall::GetTask { task_id } => self.execute_get(owner, task_id).await,
            ToolCall::UpdateTask {
                task_id,
                title,
                description,
            } => {
                self.execute_update(owner, task_id, title.clone(), description.clone())
                    .await
            }
            ToolCall::CompleteTask { task_id } => self.execute_complete(owner, task_id).await,
            ToolCall::DeleteTask { task_id } => self.execute_delete(owner, task_id).await,
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!("Tool execution failed: {}", e);
                ToolResult::Error(ToolError::execution(e.to_string()))
            }
        }
    }

    async fn execute_add(
        &self,
        owner: &str,
        title: &str,
        description: Option<&str>,
    ) -> crate::error::Result<ToolResult> {
        let task = self.tasks.create_task(owner, title, description).await?;
        Ok(ToolResult::Success(json!({
            "task_id": task.id.to_string(),
            "status": "created",
            "title": task.title,
        })))
    }

    async fn execute_list(
        &self,
        owner: &str,
        status: StatusFilter,
    ) -> crate::error::Result<ToolResult> {
        let tasks = self.tasks.list_tasks(owner).await?;

        // Filtered client-side after fetching the owner's full set; fine at
        // personal-todo-list scale.
        let filtered: Vec<Value> = tasks
            .iter()
            .filter(|t| match status {
                StatusFilter::All => true,
                StatusFilter::Pending => !t.completed,
                StatusFilter::Completed => t.completed,
            })
            .map(task_to_value)
            .collect();

        Ok(ToolResult::Success(json!({
            "count": filtered.len(),
            "tasks": filtered,
        })))
    }

    async fn execute_get(&self, owner: &str, task_id: &str) -> crate::error::Result<ToolResult> {
        let id = match parse_task_id(task_id) {
            Ok(id) => id,
            Err(e) => return Ok(ToolResult::Error(e)),
        };

        match self.tasks.get_task(owner, id).await? {
            Some(task) => Ok(ToolResult::Success(task_to_value(&task))),
            None => Ok(ToolResult::Error(ToolError::not_found("Task not found"))),
        }
    }

    async fn execute_update(
        &self,
        owner: &str,
        task_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> crate::error::Result<ToolResult> {
        let id = match parse_task_id(task_id) {
            Ok(id) => id,
            Err(e) => return Ok(ToolResult::Error(e)),
        };

        let changes = TaskChanges {
            title,
            description,
            completed: None,
        };

        match self.tasks.update_task(owner, id, changes).await? {
            Some(task) => Ok(ToolResult::Success(json!({
                "task_id": task.id.to_string(),
                "status": "updated",
                "title": task.title,
            }))),
            None => Ok(ToolResult::Error(ToolError::not_found("Task not found"))),
        }
    }

    async fn execute_complete(
        &self,
        owner: &str,
        task_id: &str,
    ) -> crate::error::Result<ToolResult> {
        let id = match parse_task_id(task_id) {
            Ok(id) => id,
            Err(e) => return Ok(ToolResult::Error(e)),
        };

        let Some(task) = self.tasks.get_task(owner, id).await? else {
            return Ok(ToolResult::Error(ToolError::not_found("Task not found")));
        };

        // Idempotent: an already-completed task is left untouched.
        let task = if task.completed {
            task
        } else {
            match self.tasks.toggle_completion(owner, id).await? {
                Some(task) => task,
                None => return Ok(ToolResult::Error(ToolError::not_found("Task not found"))),
            }
        };

        Ok(ToolResult::Success(json!({
            "task_id": task.id.to_string(),
            "status": "completed",
            "title": task.title,
        })))
    }

    async fn execute_delete(&self, owner: &str, task_id: &str) -> crate::error::Result<ToolResult> {
        let id = match parse_task_id(task_id) {
            Ok(id) => id,
            Err(e) => return Ok(ToolResult::Error(e)),
        };

        // Fetch first so the response can carry the title.
        let Some(task) = self.tasks.get_task(owner, id).await? else {
            return Ok(ToolResult::Error(ToolError::not_found("Task not found")));
        };

        if !self.tasks.delete_task(owner, id).await? {
            return Ok(ToolResult::Error(ToolError::not_found("Task not found")));
        }

        Ok(ToolResult::Success(json!({
            "task_id": task.id.to_string(),
            "status": "deleted",
            "title": task.title,
        })))
    }
}

fn parse_task_id(task_id: &str) -> std::result::Result<Uuid, ToolError> {
    Uuid::parse_str(task_id).map_err(|_| ToolError::validation("Invalid task ID format"))
}

fn task_to_value(task: &crate::store::Task) -> Value {
    json!({
        "id": task.id.to_string(),
        "title": task.title,
        "description": task.description,
        "completed": task.completed,
        "created_at": task.created_at.to_rfc3339(),
        "updated_at": task.updated_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_parse_add_task() {
        let call = parse_tool_call(
            ToolKind::AddTask,
            &json!({"title": "Buy milk", "description": "Two liters"}),
        )
        .unwrap();
        assert_eq!(
            call,
            ToolCall::AddTask {
                title: "Buy milk".to_string(),
                description: Some("Two liters".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_add_task_missing_title() {
        let err = parse_tool_call(ToolKind::AddTask, &json!({})).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::ValidationError);
    }

    #[test]
    fn test_parse_add_task_title_too_long() {
        let err = parse_tool_call(ToolKind::AddTask, &json!({"title": "x".repeat(501)}))
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::ValidationError);
    }

    #[test]
    fn test_parse_list_tasks_status() {
        let call = parse_tool_call(ToolKind::ListTasks, &json!({"status": "pending"})).unwrap();
        assert_eq!(
            call,
            ToolCall::ListTasks {
                status: StatusFilter::Pending
            }
        );

        let call = parse_tool_call(ToolKind::ListTasks, &json!({})).unwrap();
        assert_eq!(
            call,
            ToolCall::ListTasks {
                status: StatusFilter::All
            }
        );

        let err = parse_tool_call(ToolKind::ListTasks, &json!({"status": "done"})).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn test_execute_add_and_complete_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let ctx = ToolContext::new(store.clone());

        let result = ctx
            .execute(
                &ToolCall::AddTask {
                    title: "Buy milk".to_string(),
                    description: None,
                },
                "alice",
            )
            .await;
        let payload = result.to_value();
        assert_eq!(payload["status"], "created");
        let task_id = payload["task_id"].as_str().unwrap().to_string();

        let first = ctx
            .execute(
                &ToolCall::CompleteTask {
                    task_id: task_id.clone(),
                },
                "alice",
            )
            .await;
        assert_eq!(first.to_value()["status"], "completed");

        let id = Uuid::parse_str(&task_id).unwrap();
        let after_first = store.get_task("alice", id).await.unwrap().unwrap();

        // Second completion succeeds without touching the task again
        let second = ctx
            .execute(&ToolCall::CompleteTask { task_id }, "alice")
            .await;
        assert_eq!(second.to_value()["status"], "completed");

        let after_second = store.get_task("alice", id).await.unwrap().unwrap();
        assert!(after_second.completed);
        assert_eq!(after_second.updated_at, after_first.updated_at);
    }

    #[tokio::test]
    async fn test_execute_cross_owner_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let ctx = ToolContext::new(store.clone());

        let task = store.create_task("alice", "Buy milk", None).await.unwrap();
        let task_id = task.id.to_string();

        for call in [
            ToolCall::GetTask {
                task_id: task_id.clone(),
            },
            ToolCall::UpdateTask {
                task_id: task_id.clone(),
                title: Some("hijack".to_string()),
                description: None,
            },
            ToolCall::CompleteTask {
                task_id: task_id.clone(),
            },
            ToolCall::DeleteTask {
                task_id: task_id.clone(),
            },
        ] {
            let result = ctx.execute(&call, "bob").await;
            let payload = result.to_value();
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error"]["type"], "not_found");
        }

        // Task untouched
        let task = store.get_task("alice", task.id).await.unwrap().unwrap();
        assert_eq!(task.title, "Buy milk");
        assert!(!task.completed);
    }

    #[tokio::test]
    async fn test_execute_get_invalid_id() {
        let ctx = ToolContext::new(Arc::new(MemoryStore::new()));
        let result = ctx
            .execute(
                &ToolCall::GetTask {
                    task_id: "not-a-uuid".to_string(),
                },
                "alice",
            )
            .await;
        let payload = result.to_value();
        assert_eq!(payload["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_execute_list_filters() {
        let store = Arc::new(MemoryStore::new());
        let ctx = ToolContext::new(store.clone());

        let done = store.create_task("alice", "Done", None).await.unwrap();
        store.create_task("alice", "Pending", None).await.unwrap();
        store.toggle_completion("alice", done.id).await.unwrap();

        let all = ctx
            .execute(
                &ToolCall::ListTasks {
                    status: StatusFilter::All,
                },
                "alice",
            )
            .await
            .to_value();
        assert_eq!(all["count"], 2);

        let pending = ctx
            .execute(
                &ToolCall::ListTasks {
                    status: StatusFilter::Pending,
                },
                "alice",
            )
            .await
            .to_value();
        assert_eq!(pending["count"], 1);
        assert_eq!(pending["tasks"][0]["title"], "Pending");
    }
}
