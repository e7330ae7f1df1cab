use anyhow::{Context, Result};
use mermend_core::{FamilyHint, Session, SessionEntry};
use mermend_llm::diagram::{DiagramRequest, generate_diagram_with_backend};
use mermend_llm::{LlmClient, LlmConfig};
use std::io::{BufRead, Write};
use std::process::ExitCode;
use tracing::warn;

use crate::commands::escalation_note;

const TITLE_CHARS: usize = 40;

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Quit,
    History,
    Favorites,
    /// 1-based index into the history listing.
    Favorite(usize),
    Describe(String),
    Empty,
    Invalid(String),
}

fn parse_command(line: &str) -> ShellCommand {
    let line = line.trim();
    if line.is_empty() {
        return ShellCommand::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return ShellCommand::Describe(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit" | "q"), None) => ShellCommand::Quit,
        (Some("history"), None) => ShellCommand::History,
        (Some("favorites"), None) => ShellCommand::Favorites,
        (Some("fav"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => ShellCommand::Favorite(n),
            _ => ShellCommand::Invalid(format!("not a history number: {n}")),
        },
        _ => ShellCommand::Invalid(format!("unknown command: {line}")),
    }
}

fn title_for(description: &str) -> String {
    let mut title: String = description.chars().take(TITLE_CHARS).collect();
    if description.chars().count() > TITLE_CHARS {
        title.push_str("...");
    }
    title
}

fn print_entries(entries: &[SessionEntry]) {
    if entries.is_empty() {
        println!("(empty)");
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("{:>2}. [{}] {}", i + 1, entry.timestamp, entry.title);
    }
}

/// Read descriptions from stdin until EOF or `:quit`, generating one diagram
/// per line and keeping them in a session.
pub async fn run(family: FamilyHint, llm_config: LlmConfig) -> Result<ExitCode> {
    let client = LlmClient::new(llm_config);
    let mut session = Session::new();
    let feature = family.display_name();

    println!(
        "{} generator ({}). Describe a diagram, or :history, :fav <n>, :favorites, :quit",
        feature,
        client.config().model
    );

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else { break };
        let line = line.context("Failed to read stdin")?;

        match parse_command(&line) {
            ShellCommand::Quit => break,
            ShellCommand::Empty => {}
            ShellCommand::Invalid(message) => println!("{message}"),
            ShellCommand::History => print_entries(session.history(feature)),
            ShellCommand::Favorites => print_entries(session.favorites()),
            ShellCommand::Favorite(n) => match session.favorite_from_history(feature, n - 1) {
                Some(entry) => println!("Saved to favorites: {}", entry.title),
                None => println!("No history entry {n}"),
            },
            ShellCommand::Describe(description) => {
                let request = DiagramRequest::new(description.as_str(), family);
                match generate_diagram_with_backend(&client, &request).await {
                    Ok(result) => {
                        let text = result.source.text();
                        println!("{text}");
                        if let Some(note) = escalation_note(&result) {
                            println!("{note}");
                        }
                        for finding in &result.findings {
                            println!("  {finding}");
                        }
                        session.add_to_history(feature, &title_for(&description), &text);
                    }
                    Err(e) => {
                        warn!("Generation failed: {}", e);
                        println!("{}", e.user_message());
                    }
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
