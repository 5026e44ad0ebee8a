//! UI utilities for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use srag_core::{Result, ScoredResult};
use srag_rag::{ChatResponse, IngestStatus, UploadOutcome};

/// Display startup banner
pub fn display_banner(title: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(40);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let title_line = format!(
        "│  {}{}│",
        title.blue().bold(),
        " ".repeat(banner_width.saturating_sub(title.chars().count() + 4))
    );
    println!("{}", title_line);

    println!("{}", empty_line.blue());

    let feature_lines = [
        "📚 Chat with your documents",
        "",
        "• Answers grounded in the files you uploaded",
        "• /context <file> to ask about one file only",
        "• /cite to show the source chunks of each answer",
        "• ⬆️  History navigation (↑/↓ arrows)",
        "",
        concat!("v", env!("CARGO_PKG_VERSION")),
    ];

    for line in feature_lines {
        if line.is_empty() {
            println!("{}", empty_line.blue());
            continue;
        }
        let padding = " ".repeat(banner_width.saturating_sub(line.chars().count() + 4));
        let content = if line.starts_with('v') {
            format!("│  {}{}│", line.dimmed(), padding)
        } else {
            format!("│  {}{}│", line, padding)
        };
        println!("{}", content.blue());
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!("{}", "💡 Tip: Ask a question, or type 'help' for commands".dimmed());
    println!();
}

/// Read one line with history navigation.
///
/// Returns `None` at end of input (closed stdin, Ctrl-C or Ctrl-D).
pub async fn handle_input_with_history(prompt: &str, history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    enable_raw_mode()?;
    let result = read_line_raw(prompt, history);
    disable_raw_mode()?;
    println!();
    result
}

fn read_line_raw(prompt: &str, history: &mut Vec<String>) -> Result<Option<String>> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;
    let prompt = prompt.green().bold();

    print!("{} ", prompt);
    io::stdout().flush()?;

    let redraw = |input: &str| -> Result<()> {
        print!("\r{} {}\x1b[K", prompt, input);
        io::stdout().flush()?;
        Ok(())
    };

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        match key_event.code {
            KeyCode::Char('c') | KeyCode::Char('d')
                if key_event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return Ok(None);
            }
            KeyCode::Enter => {
                let input = input.trim().to_string();
                if !input.is_empty() {
                    history.push(input.clone());
                }
                return Ok(Some(input));
            }
            KeyCode::Char(c) => {
                input.push(c);
                redraw(&input)?;
            }
            KeyCode::Backspace => {
                if input.pop().is_some() {
                    redraw(&input)?;
                }
            }
            KeyCode::Up => {
                if !history.is_empty() {
                    let new_index = match history_index {
                        None => history.len() - 1,
                        Some(idx) if idx > 0 => idx - 1,
                        Some(idx) => idx,
                    };
                    history_index = Some(new_index);
                    input = history[new_index].clone();
                    redraw(&input)?;
                }
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                    redraw(&input)?;
                }
            }
            KeyCode::Esc => {
                return Ok(Some(String::new()));
            }
            _ => {}
        }
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask about your uploaded documents", "<question>".green());
    println!("  {} - Only use chunks from one uploaded file", "/context <file>".green());
    println!("  {} - Use every uploaded file again", "/context".green());
    println!("  {} - Toggle source citations", "/cite".green());
    println!("  {} - List uploaded files", "/files".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
}

pub fn print_about() {
    println!("{}", "About this app".bold());
    println!("A small retrieval-augmented generation app: upload documents, then chat with them.");
    println!("Uploads are split into chunks, embedded and stored in a vector index; each question");
    println!("retrieves the closest chunks, trims them to their most relevant sentences and hands");
    println!("them to the language model as context.");
}

/// Shown when nothing has been uploaded yet
pub fn print_knows_nothing() {
    println!("{}", "I'm like Jon Snow,".cyan());
    println!("{}", "I know nothing. 🤷".cyan());
    println!(
        "{} Upload files to provide context: {}",
        "⬆️".yellow(),
        "simple-rag upload <file>".green()
    );
}

pub fn print_files(files: &[String]) {
    if files.is_empty() {
        println!("{}", "No files uploaded yet.".dimmed());
        return;
    }
    println!("{}", "Uploaded files:".bold());
    for file in files {
        println!("  {} {}", "•".blue(), file);
    }
}

pub fn print_assistant(message: &str) {
    println!("{} {}", "🤖".blue(), message);
}

pub fn print_status(status: &IngestStatus) {
    let line = status.to_string();
    match status {
        IngestStatus::Failed { .. } => println!("{}", line.red()),
        IngestStatus::Completed { .. } => println!("{}", line.green()),
        _ => println!("{}", line),
    }
}

pub fn print_upload_outcome(file_name: &str, outcome: &UploadOutcome) {
    match outcome {
        UploadOutcome::Ingested { chunks } => println!(
            "{} File uploaded successfully ⬆️  ({} chunks from {})",
            "✅".green(),
            chunks,
            file_name
        ),
        UploadOutcome::AlreadyIngested => println!(
            "{} {} was already uploaded. Use --force to ingest it again.",
            "⚠️".yellow(),
            file_name
        ),
        UploadOutcome::Failed { error } => {
            println!("{} Upload of {} failed: {}", "❌".red(), file_name, error)
        }
    }
}

/// Heading line of a cited source
pub fn citation_header(index: usize, result: &ScoredResult) -> String {
    format!("Source node {}: score={}", index + 1, result.score)
}

pub fn print_answer(response: &ChatResponse, cite_nodes: bool) {
    print_assistant(&response.answer);

    if !cite_nodes {
        return;
    }
    for (i, node) in response.sources.iter().enumerate() {
        println!();
        println!("{}", citation_header(i, node).bold());
        if !node.metadata.file_name.is_empty() {
            println!("{}", format!("from {}", node.metadata.file_name).dimmed());
        }
        println!("{}", node.text);
    }
}
