//! Special commands parser for the interactive chat
//!
//! Lines starting with `/` manage the conversation instead of being sent.
//! Commands are case-insensitive; message positions are 1-based as shown
//! by `/show`.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Archive the conversation and start over
    NewChat,
    /// Archive the conversation and keep going
    SaveChat,
    /// Drop the conversation without archiving
    ClearChat,
    /// Print the conversation with positions
    Show,
    /// Replace the user message at `position` and re-send
    Edit { position: usize, content: String },
    /// Ask again for the reply at `position`, or the last reply
    Regenerate { position: Option<usize> },
    /// Select a prompt by label
    SelectPrompt(String),
    /// List prompts
    ListPrompts,
    /// Send the staged input
    Send,
    /// Show today's usage
    Usage,
    /// Show help
    Help,
    /// Leave the chat
    Exit,
    /// Not a special command; send as a message
    None,
}

fn position(command: &str, arg: &str) -> Result<usize, CommandError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        }),
    }
}

/// Parse a line typed in the chat
///
/// # Errors
///
/// Returns `CommandError` for an unknown command or a bad argument
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match head.as_str() {
        "exit" | "quit" | "/exit" | "/quit" | "/q" => Ok(SpecialCommand::Exit),
        "/new" => Ok(SpecialCommand::NewChat),
        "/save" => Ok(SpecialCommand::SaveChat),
        "/clear" => Ok(SpecialCommand::ClearChat),
        "/show" => Ok(SpecialCommand::Show),
        "/send" => Ok(SpecialCommand::Send),
        "/usage" => Ok(SpecialCommand::Usage),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/prompts" => Ok(SpecialCommand::ListPrompts),
        "/prompt" if rest.is_empty() => Err(CommandError::MissingArgument {
            command: "/prompt".to_string(),
            usage: "/prompt <label>".to_string(),
        }),
        "/prompt" => Ok(SpecialCommand::SelectPrompt(rest.to_string())),
        "/regen" if rest.is_empty() => Ok(SpecialCommand::Regenerate { position: None }),
        "/regen" => Ok(SpecialCommand::Regenerate {
            position: Some(position("/regen", rest)?),
        }),
        "/edit" => {
            let missing = || CommandError::MissingArgument {
                command: "/edit".to_string(),
                usage: "/edit <position> <new message>".to_string(),
            };
            let (pos, content) = rest.split_once(char::is_whitespace).ok_or_else(missing)?;
            let content = content.trim();
            if content.is_empty() {
                return Err(missing());
            }
            Ok(SpecialCommand::Edit {
                position: position("/edit", pos)?,
                content: content.to_string(),
            })
        }
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help for the chat commands
pub fn print_help() {
    println!(
        r#"
Chat Commands
=============

CONVERSATION:
  /new                 - Archive this chat and start a new one
  /save                - Archive this chat and keep going
  /clear               - Drop this chat without archiving
  /show                - Show the conversation with positions

MESSAGES:
  /edit <n> <text>     - Replace your message at position n and re-send
  /regen [n]           - Ask again for the reply at position n (default: last)
  /send                - Send the staged input

PROMPTS:
  /prompts             - List prompt templates
  /prompt <label>      - Select a prompt template

OTHER:
  /usage               - Show today's usage
  /help                - Show this help
  /quit, exit          - Leave the chat

Anything else is sent as the next message.
"#
    );
}
