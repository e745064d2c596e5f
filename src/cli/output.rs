//! CLI output formatting utilities.

use crate::store::Task;
use console::style;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a task line.
    pub fn task_item(index: usize, task: &Task) {
        let marker = if task.completed {
            style("[x]").green()
        } else {
            style("[ ]").cyan()
        };
        println!(
            "  {}. {} {} {}",
            index,
            marker,
            style(&task.title).bold(),
            style(task.id.to_string()).dim()
        );
        if let Some(description) = &task.description {
            println!("       {}", style(description).dim());
        }
    }
}
