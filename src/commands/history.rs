use crate::chat::{AskHistory, AskRecord, ChatArchive, Conversation};
use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::error::{PopAskError, Result};
use colored::Colorize;
use prettytable::{format, Table};

const PREVIEW_CHARS: usize = 40;

/// Handle history commands
///
/// Without `--asks` the commands work on archived chats; with it, on the
/// quick-ask records.
pub fn handle_history(config: Config, command: HistoryCommand) -> Result<()> {
    let ctx = super::open_context(config)?;
    let store = ctx.store.as_ref();

    match command {
        HistoryCommand::List { asks: false } => {
            let archive = ChatArchive::load(store);
            print_sessions(archive.sessions().iter().enumerate());
        }
        HistoryCommand::List { asks: true } => {
            let history = AskHistory::load(store);
            print_asks(history.records().iter().enumerate());
        }
        HistoryCommand::Search {
            keyword,
            asks: false,
        } => {
            let archive = ChatArchive::load(store);
            print_sessions(archive.search(&keyword).into_iter());
        }
        HistoryCommand::Search { keyword, asks: true } => {
            let history = AskHistory::load(store);
            print_asks(history.search(&keyword).into_iter());
        }
        HistoryCommand::Delete { index, asks: false } => {
            let mut archive = ChatArchive::load(store);
            archive
                .delete(index)
                .ok_or_else(|| PopAskError::Storage(format!("No archived chat at {}", index)))?;
            archive.save(store);
            println!("{}", format!("Deleted archived chat {}", index).green());
        }
        HistoryCommand::Delete { index, asks: true } => {
            let mut history = AskHistory::load(store);
            history
                .delete(index)
                .ok_or_else(|| PopAskError::Storage(format!("No ask record at {}", index)))?;
            history.save(store);
            println!("{}", format!("Deleted ask record {}", index).green());
        }
        HistoryCommand::Clear { asks: false } => {
            let mut archive = ChatArchive::load(store);
            archive.clear();
            archive.save(store);
            println!("{}", "Cleared archived chats".green());
        }
        HistoryCommand::Clear { asks: true } => {
            let mut history = AskHistory::load(store);
            history.clear();
            history.save(store);
            println!("{}", "Cleared ask history".green());
        }
    }

    Ok(())
}

fn preview(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

fn print_sessions<'a>(sessions: impl Iterator<Item = (usize, &'a Conversation)>) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "#".bold(),
        "First Message".bold(),
        "Messages".bold(),
        "Started".bold()
    ]);

    let mut rows = 0;
    for (index, session) in sessions {
        let first = session.messages().first();
        let started = first
            .map(|m| m.created_at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(prettytable::row![
            index.to_string().cyan(),
            preview(first.map(|m| m.content.as_str()).unwrap_or("")),
            session.len(),
            started
        ]);
        rows += 1;
    }

    if rows == 0 {
        println!("{}", "No archived chats found.".yellow());
        return;
    }

    println!("\nArchived Chats:");
    table.printstd();
    println!();
}

fn print_asks<'a>(records: impl Iterator<Item = (usize, &'a AskRecord)>) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "#".bold(),
        "Question".bold(),
        "Answer".bold(),
        "Asked".bold()
    ]);

    let mut rows = 0;
    for (index, record) in records {
        table.add_row(prettytable::row![
            index.to_string().cyan(),
            preview(&record.message),
            preview(&record.response),
            record.created_at.format("%Y-%m-%d %H:%M").to_string()
        ]);
        rows += 1;
    }

    if rows == 0 {
        println!("{}", "No ask history found.".yellow());
        return;
    }

    println!("\nAsk History:");
    table.printstd();
    println!();
}
