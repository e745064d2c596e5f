//! Task command - direct task management without the assistant.

use crate::agent::StatusFilter;
use crate::chat::open_stores;
use crate::cli::{Output, TaskCommands};
use crate::config::Settings;
use anyhow::bail;

/// Run a task subcommand.
pub async fn run_task(owner: &str, action: &TaskCommands, settings: Settings) -> anyhow::Result<()> {
    let (tasks, _) = open_stores(&settings)?;

    match action {
        TaskCommands::Add { title, description } => {
            let title = title.trim();
            if title.is_empty() || title.chars().count() > 500 {
                bail!("Title must be between 1 and 500 characters");
            }
            let task = tasks
                .create_task(owner, title, description.as_deref())
                .await?;
            Output::success(&format!("Added \"{}\" ({})", task.title, task.id));
        }

        TaskCommands::List { status } => {
            let filter: StatusFilter = status
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let all = tasks.list_tasks(owner).await?;
            let filtered: Vec<_> = all
                .iter()
                .filter(|t| match filter {
                    StatusFilter::All => true,
                    StatusFilter::Pending => !t.completed,
                    StatusFilter::Completed => t.completed,
                })
                .collect();

            if filtered.is_empty() {
                Output::info("No tasks found.");
                return Ok(());
            }

            Output::header("Tasks");
            for (i, task) in filtered.into_iter().enumerate() {
                Output::task_item(i + 1, task);
            }
        }

        TaskCommands::Done { id } => {
            let Some(task) = tasks.get_task(owner, *id).await? else {
                bail!("Task not found: {}", id);
            };
            if task.completed {
                Output::info(&format!("\"{}\" is already done.", task.title));
                return Ok(());
            }
            match tasks.toggle_completion(owner, *id).await? {
                Some(task) => Output::success(&format!("Done: \"{}\"", task.title)),
                None => bail!("Task not found: {}", id),
            }
        }

        TaskCommands::Rm { id } => {
            let Some(task) = tasks.get_task(owner, *id).await? else {
                bail!("Task not found: {}", id);
            };
            if tasks.delete_task(owner, *id).await? {
                Output::success(&format!("Deleted \"{}\"", task.title));
            } else {
                bail!("Task not found: {}", id);
            }
        }
    }

    Ok(())
}
