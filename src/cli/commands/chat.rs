//! Interactive chat command.

use crate::chat::ChatService;
use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::io::{self, BufRead, Write};
use uuid::Uuid;

/// Run the interactive chat command.
pub async fn run_chat(owner: &str, settings: Settings) -> anyhow::Result<()> {
    let service = ChatService::new(&settings)?;

    println!("\n{}", style("Gjort Chat").bold().cyan());
    println!(
        "{}\n",
        style("Tell me what you need to get done, or 'exit' to quit.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut conversation: Option<Uuid> = None;

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        match service.send_message(owner, conversation, input).await {
            Ok(reply) => {
                conversation = Some(reply.conversation_id);
                if let Some(tool_calls) = &reply.message.tool_calls {
                    for call in tool_calls {
                        println!("{}", style(format!("  [{}]", call.tool)).dim());
                    }
                }
                println!(
                    "\n{} {}\n",
                    style("Gjort:").cyan().bold(),
                    reply.message.content
                );
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
