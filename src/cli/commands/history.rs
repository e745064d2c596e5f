//! History command - page through conversation history.

use crate::chat::ChatService;
use crate::cli::Output;
use crate::config::Settings;
use crate::store::MessageRole;
use console::style;
use uuid::Uuid;

/// Run the history command.
pub async fn run_history(
    owner: &str,
    limit: Option<usize>,
    before: Option<Uuid>,
    conversation: Option<Uuid>,
    settings: Settings,
) -> anyhow::Result<()> {
    let service = ChatService::new(&settings)?;
    let page = service
        .get_history(owner, conversation, limit, before)
        .await?;

    let Some(conversation_id) = page.conversation_id else {
        Output::info("No conversations yet. Start one with 'gjort chat'.");
        return Ok(());
    };

    Output::header("Conversation History");
    Output::kv("conversation", &conversation_id.to_string());
    println!();

    for message in &page.messages {
        let prefix = match message.role {
            MessageRole::User => style("You:").green().bold(),
            MessageRole::Assistant => style("Gjort:").cyan().bold(),
        };
        println!(
            "{} {}",
            style(message.created_at.format("%Y-%m-%d %H:%M").to_string()).dim(),
            prefix
        );
        println!("  {}", message.content);
        if let Some(tool_calls) = &message.tool_calls {
            for call in tool_calls {
                println!("  {}", style(format!("[{}]", call.tool)).dim());
            }
        }
        println!();
    }

    if page.has_more {
        if let Some(oldest) = page.messages.first() {
            Output::info(&format!(
                "Older messages available. See them with: gjort history --before {}",
                oldest.id
            ));
        }
    }

    Ok(())
}
