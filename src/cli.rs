//! Command-line interface definition for PopAsk
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// PopAsk - ask an AI about whatever you just selected
///
/// Chat with a remote completion endpoint, turn selections or screenshots
/// into prompts, and browse the saved history.
#[derive(Parser, Debug, Clone)]
#[command(name = "popask")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the key-value store database path
    #[arg(long, env = "POPASK_STORE_DB")]
    pub store: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for PopAsk
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Ask a single question without keeping a transcript
    Ask {
        /// Question text
        text: String,

        /// Label of the prompt template to prepend
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Feed a captured selection through the selection binder
    Capture {
        /// Selected text (or an image path when --ocr is set)
        text: String,

        /// Treat the text as an image path and run OCR on it
        #[arg(long)]
        ocr: bool,

        /// Label of the prompt template to use
        #[arg(short, long)]
        prompt: Option<String>,

        /// Stage the message without sending it
        #[arg(long)]
        no_send: bool,
    },

    /// Show today's usage against the daily limit
    Usage,

    /// Browse saved conversations and quick-ask history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Manage prompt templates
    Prompts {
        /// Prompt subcommand
        #[command(subcommand)]
        command: PromptCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List saved entries
    List {
        /// Show quick-ask history instead of archived chats
        #[arg(long)]
        asks: bool,
    },

    /// Search saved entries by keyword
    Search {
        /// Case-insensitive keyword
        keyword: String,

        /// Search quick-ask history instead of archived chats
        #[arg(long)]
        asks: bool,
    },

    /// Delete a saved entry by its list index
    Delete {
        /// Zero-based index as shown by `history list`
        index: usize,

        /// Delete from quick-ask history instead of archived chats
        #[arg(long)]
        asks: bool,
    },

    /// Delete all saved entries
    Clear {
        /// Clear quick-ask history instead of archived chats
        #[arg(long)]
        asks: bool,
    },
}

/// Prompt template subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PromptCommand {
    /// List prompt templates and recently used ones
    List,

    /// Select the active prompt template by label
    Select {
        /// Prompt label
        label: String,
    },

    /// Add a prompt template
    Add {
        /// Prompt label
        label: String,

        /// Template text placed before the selection
        template: String,
    },

    /// Remove a prompt template by label
    Remove {
        /// Prompt label
        label: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            store: None,
            command: Commands::Usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(cli.store.is_none());
        assert!(matches!(cli.command, Commands::Usage));
    }

    #[test]
    fn test_cli_parse_ask() {
        let cli = Cli::try_parse_from(["popask", "ask", "what is rust", "-p", "Explain"]).unwrap();
        if let Commands::Ask { text, prompt } = cli.command {
            assert_eq!(text, "what is rust");
            assert_eq!(prompt, Some("Explain".to_string()));
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_cli_parse_capture_ocr() {
        let cli =
            Cli::try_parse_from(["popask", "capture", "shot.png", "--ocr", "--no-send"]).unwrap();
        if let Commands::Capture {
            text, ocr, no_send, ..
        } = cli.command
        {
            assert_eq!(text, "shot.png");
            assert!(ocr);
            assert!(no_send);
        } else {
            panic!("Expected Capture command");
        }
    }

    #[test]
    fn test_cli_parse_history_delete() {
        let cli = Cli::try_parse_from(["popask", "history", "delete", "2", "--asks"]).unwrap();
        if let Commands::History {
            command: HistoryCommand::Delete { index, asks },
        } = cli.command
        {
            assert_eq!(index, 2);
            assert!(asks);
        } else {
            panic!("Expected History Delete command");
        }
    }

    #[test]
    fn test_cli_parse_store_flag() {
        let cli = Cli::try_parse_from(["popask", "--store", "/tmp/x.db", "usage"]).unwrap();
        assert_eq!(cli.store.as_deref(), Some("/tmp/x.db"));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["popask"]).is_err());
    }
}
