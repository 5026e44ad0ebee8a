//! Terminal interface for Simple RAG

mod chat_loop;
pub mod ui;

#[cfg(test)]
mod tests;

pub use chat_loop::{ChatCommand, run_chat};
pub use ui::{display_banner, handle_input_with_history};

// Re-export core types
pub use srag_core::{Error, Result};
