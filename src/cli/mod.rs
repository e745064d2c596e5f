//! CLI module for Gjort.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Gjort - Conversational Task Management
///
/// A CLI todo list you talk to. Messages go through an LLM agent that
/// manages your tasks with tool calls. The name "Gjort" comes from the
/// Norwegian word for "done."
#[derive(Parser, Debug)]
#[command(name = "gjort")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Act as this user instead of the configured default
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Gjort and verify configuration
    Init,

    /// Start an interactive chat session with the task assistant
    Chat,

    /// Send a single message to the task assistant
    Send {
        /// The message to send (e.g., "remind me to buy milk")
        message: String,

        /// Conversation to continue (defaults to the most recent)
        #[arg(long)]
        conversation: Option<Uuid>,
    },

    /// Show conversation history
    History {
        /// Maximum messages per page (1-100)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show messages older than this message ID
        #[arg(long)]
        before: Option<Uuid>,

        /// Conversation to show (defaults to the most recent)
        #[arg(long)]
        conversation: Option<Uuid>,
    },

    /// Manage tasks directly, without the assistant
    Task {
        #[command(subcommand)]
        action: TaskCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List tasks
    List {
        /// Filter by status (all, pending, completed)
        #[arg(short, long, default_value = "all")]
        status: String,
    },

    /// Mark a task as complete
    Done {
        /// Task ID
        id: Uuid,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "model.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
