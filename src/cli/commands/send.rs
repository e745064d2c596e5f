//! Send command - one-shot message to the assistant.

use crate::chat::ChatService;
use crate::config::Settings;
use console::style;
use uuid::Uuid;

/// Run the send command.
pub async fn run_send(
    owner: &str,
    message: &str,
    conversation: Option<Uuid>,
    settings: Settings,
) -> anyhow::Result<()> {
    let service = ChatService::new(&settings)?;
    let reply = service.send_message(owner, conversation, message).await?;

    if let Some(tool_calls) = &reply.message.tool_calls {
        for call in tool_calls {
            println!("{}", style(format!("  [{}]", call.tool)).dim());
        }
    }
    println!("{}", reply.message.content);

    Ok(())
}
