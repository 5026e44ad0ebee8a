//! Interactive chat loop

use colored::*;
use serde::Serialize;

use srag_core::Result;
use srag_rag::{ChatPipeline, ChatSession, FilenameLedger, GREETING};

use crate::ui;

/// One line of user input, interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChatCommand {
    Ask(String),
    ToggleCite,
    /// Select a context file, or clear the selection with `None`
    Context(Option<String>),
    Files,
    Help,
    Exit,
    Empty,
}

impl ChatCommand {
    pub fn parse(input: &str) -> ChatCommand {
        let input = input.trim();
        if input.is_empty() {
            return ChatCommand::Empty;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" | "/exit" | "/quit" => return ChatCommand::Exit,
            "help" | "/help" => return ChatCommand::Help,
            "/cite" => return ChatCommand::ToggleCite,
            "/files" => return ChatCommand::Files,
            "/context" => return ChatCommand::Context(None),
            _ => {}
        }

        if let Some(file) = input.strip_prefix("/context ") {
            return ChatCommand::Context(Some(file.trim().to_string()));
        }

        ChatCommand::Ask(input.to_string())
    }
}

/// Run the chat loop until the user exits or input ends
pub async fn run_chat(pipeline: &ChatPipeline, ledger: &FilenameLedger, session: &mut ChatSession) -> Result<()> {
    if let Some(file) = session.context_file() {
        println!("{} Context: {}", "📄".blue(), file.bold());
    }
    ui::print_assistant(GREETING);

    let mut history = Vec::new();

    while let Some(input) = ui::handle_input_with_history("you>", &mut history).await? {
        match ChatCommand::parse(&input) {
            ChatCommand::Empty => continue,
            ChatCommand::Exit => break,
            ChatCommand::Help => ui::print_help(),
            ChatCommand::Files => ui::print_files(&ledger.filenames().await?),
            ChatCommand::ToggleCite => {
                let state = if session.toggle_citations() { "on" } else { "off" };
                println!("{} Citations {}", "📎".blue(), state);
            }
            ChatCommand::Context(None) => {
                session.set_context_file(None);
                println!("{} Using all uploaded files", "📄".blue());
            }
            ChatCommand::Context(Some(file)) => {
                if ledger.contains(&file).await? {
                    println!("{} Context: {}", "📄".blue(), file.bold());
                    session.set_context_file(Some(file));
                } else {
                    println!("{} {} has not been uploaded", "⚠️".yellow(), file);
                    ui::print_files(&ledger.filenames().await?);
                }
            }
            ChatCommand::Ask(question) => {
                println!("{}", "Thinking...".dimmed());
                let response = pipeline.chat(session, &question).await;
                ui::print_answer(&response, session.cite_nodes());
            }
        }
    }

    println!("{}", "👋 Goodbye!".green());
    Ok(())
}
