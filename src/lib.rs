//! Gjort - Conversational Task Management
//!
//! A CLI task manager you talk to: natural language in, task operations out.
//!
//! The name "Gjort" comes from the Norwegian word for "done."
//!
//! # Overview
//!
//! Gjort allows you to:
//! - Manage a todo list through natural language conversation
//! - Let an LLM agent create, update, complete, and delete tasks via tools
//! - Keep multi-turn conversational context in a local database
//! - Use direct CRUD commands when you don't feel like chatting
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `store` - Task and conversation storage abstraction
//! - `agent` - Tool registry, tool handlers, and the agent loop
//! - `chat` - Chat service coordinating the store and the agent
//! - `cli` - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use gjort::chat::ChatService;
//! use gjort::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let service = ChatService::new(&settings)?;
//!
//!     let reply = service.send_message("alice", None, "Buy milk").await?;
//!     println!("{}", reply.message.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod store;

pub use error::{GjortError, Result};
