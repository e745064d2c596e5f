//! CLI command implementations.

mod chat;
mod config;
mod history;
mod init;
mod send;
mod task;

pub use chat::run_chat;
pub use config::run_config;
pub use history::run_history;
pub use init::run_init;
pub use send::run_send;
pub use task::run_task;
