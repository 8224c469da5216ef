/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`    : Interactive chat
- `ask`     : One-shot question
- `capture` : Feed a selection or screenshot through the selection binder
- `usage`   : Today's usage against the daily limit
- `history` : Archived chats and quick-ask records
- `prompts` : Prompt templates

Each handler opens the persistent store, builds the pieces it needs from
the library and prints results to the terminal.
*/

use crate::clock::SystemClock;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use crate::notice::ConsoleNotices;
use crate::storage::SqliteStore;
use std::sync::Arc;

// Special commands parser for the interactive chat
pub mod special_commands;

pub mod history;
pub mod prompts;
pub mod usage;

/// Build the application context over the on-disk store
///
/// # Errors
///
/// Returns error if the store cannot be opened
pub fn open_context(config: Config) -> Result<AppContext> {
    let store = SqliteStore::new(&config.storage)?;
    tracing::debug!("Using store at {}", store.path().display());
    Ok(AppContext::new(
        config,
        Arc::new(store),
        Arc::new(SystemClock),
        Arc::new(ConsoleNotices),
    ))
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Runs a readline loop over a [`ChatSession`]. Plain lines are sent as
    //! the next turn; `/` commands manage the conversation. Ctrl-C while a
    //! request is pending stops it.

    use super::*;
    use crate::chat::{ChatSession, Conversation, DispatchMode, DispatchOutcome, Role};
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::providers::create_provider;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::future::Future;

    /// Start the interactive chat
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let ctx = open_context(config)?;
        let provider = create_provider(&ctx.config.endpoint)?;
        let session = ChatSession::new(ctx, provider);

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner(&session);

        loop {
            let prompt = format!("{} ", "popask>".cyan().bold());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    };
                    rl.add_history_entry(trimmed)?;

                    match command {
                        SpecialCommand::Exit => break,
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::NewChat => {
                            session.new_chat();
                        }
                        SpecialCommand::SaveChat => {
                            session.save_chat();
                        }
                        SpecialCommand::ClearChat => {
                            session.clear_chat();
                        }
                        SpecialCommand::Show => print_conversation(&session.conversation()),
                        SpecialCommand::Usage => super::usage::print_usage(session.context()),
                        SpecialCommand::ListPrompts => {
                            super::prompts::print_prompts(&session.prompts())
                        }
                        SpecialCommand::SelectPrompt(label) => match session.select_prompt(&label)
                        {
                            Some(_) => println!("Selected prompt {}", label.cyan()),
                            None => eprintln!("{}", format!("No prompt named '{}'", label).red()),
                        },
                        SpecialCommand::Send => {
                            let outcome = interruptible(&session, session.send_staged()).await;
                            print_outcome(&outcome);
                        }
                        SpecialCommand::Edit { position, content } => {
                            let Some(id) = message_id(&session.conversation(), position) else {
                                eprintln!("{}", format!("No message at {}", position).red());
                                continue;
                            };
                            let outcome =
                                interruptible(&session, session.edit_message(id, &content)).await;
                            print_outcome(&outcome);
                        }
                        SpecialCommand::Regenerate { position } => {
                            let conversation = session.conversation();
                            let id = match position {
                                Some(position) => message_id(&conversation, position),
                                None => conversation
                                    .messages()
                                    .iter()
                                    .rev()
                                    .find(|m| m.role == Role::Assistant)
                                    .map(|m| m.id),
                            };
                            let Some(id) = id else {
                                eprintln!("{}", "Nothing to regenerate".red());
                                continue;
                            };
                            let outcome = interruptible(&session, session.regenerate(id)).await;
                            if outcome == DispatchOutcome::Rejected(crate::chat::Rejection::InvalidIndex)
                            {
                                eprintln!("{}", "That message has no question to answer again".red());
                            }
                            print_outcome(&outcome);
                        }
                        SpecialCommand::None => {
                            let outcome = interruptible(
                                &session,
                                session.handle_chat(trimmed, DispatchMode::Continue),
                            )
                            .await;
                            print_outcome(&outcome);
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("Error: {:?}", e);
                    break;
                }
            }
        }

        if let Some(crate::chat::ArchiveOutcome::Archived) = session.new_chat() {
            println!("Conversation archived.");
        }
        println!("Goodbye!");
        Ok(())
    }

    /// Await a dispatch, stopping it on Ctrl-C
    ///
    /// Stopping does not abort the network call; its eventual reply is
    /// dropped with the future.
    async fn interruptible(
        session: &ChatSession,
        dispatch: impl Future<Output = DispatchOutcome>,
    ) -> DispatchOutcome {
        tokio::select! {
            outcome = dispatch => outcome,
            _ = tokio::signal::ctrl_c() => {
                session.stop_request();
                DispatchOutcome::Cancelled
            }
        }
    }

    fn message_id(conversation: &Conversation, position: usize) -> Option<i64> {
        conversation.get(position.checked_sub(1)?).map(|m| m.id)
    }

    fn print_outcome(outcome: &DispatchOutcome) {
        if let DispatchOutcome::Completed(reply) = outcome {
            println!("\n{}\n", reply.content);
        }
    }

    fn print_conversation(conversation: &Conversation) {
        if conversation.is_empty() {
            println!("{}", "No messages yet.".yellow());
            return;
        }
        for (i, message) in conversation.messages().iter().enumerate() {
            let role = match message.role {
                Role::User => "you".green().bold(),
                Role::Assistant => "assistant".blue().bold(),
            };
            println!("[{}] {}: {}", i + 1, role, message.content);
        }
    }

    fn print_welcome_banner(session: &ChatSession) {
        println!();
        println!("{}", "PopAsk chat".bold());
        let prompts = session.prompts();
        if let Some(prompt) = prompts.selected_prompt() {
            println!("Prompt: {}", prompt.label.cyan());
        }
        println!("Type {} for commands, {} to leave.", "/help".cyan(), "/quit".cyan());
        println!();
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::chat::MessageFactory;
        use chrono::Utc;

        #[test]
        fn test_message_id_is_one_based() {
            let mut factory = MessageFactory::new();
            let first = factory.user("a", Utc::now());
            let second = factory.assistant("b", Utc::now());
            let conversation = Conversation::from_messages(vec![first.clone(), second.clone()]);

            assert_eq!(message_id(&conversation, 1), Some(first.id));
            assert_eq!(message_id(&conversation, 2), Some(second.id));
            assert_eq!(message_id(&conversation, 0), None);
            assert_eq!(message_id(&conversation, 3), None);
        }
    }
}

// One-shot question handler
pub mod ask {
    //! Quick ask: one question, no transcript, recorded in the ask history.

    use super::*;
    use crate::chat::prompts::{format_message, PromptLibrary};
    use crate::chat::{AskOutcome, QuickAsk};
    use crate::error::PopAskError;
    use crate::providers::create_provider;

    /// Ask one question with the selected (or named) prompt in front
    ///
    /// # Errors
    ///
    /// Returns error if the named prompt does not exist or the request fails
    pub async fn run_ask(config: Config, text: String, prompt: Option<String>) -> Result<()> {
        let ctx = open_context(config)?;
        let template = resolve_template(&ctx, prompt.as_deref())?;
        let provider = create_provider(&ctx.config.endpoint)?;

        let quick_ask = QuickAsk::new(ctx, provider);
        match quick_ask.ask(&format_message(&template, &text)).await {
            AskOutcome::Answered(record) => {
                println!("{}", record.response);
                Ok(())
            }
            AskOutcome::Failed(error) => Err(PopAskError::Provider(error).into()),
            AskOutcome::Rejected(rejection) => {
                tracing::debug!("Quick ask rejected: {:?}", rejection);
                Ok(())
            }
        }
    }

    /// Template for `label`, or the selected one when no label is given
    ///
    /// Naming a prompt also selects it.
    pub(crate) fn resolve_template(ctx: &AppContext, label: Option<&str>) -> Result<String> {
        let store = ctx.store.as_ref();
        let mut library = PromptLibrary::load(store, ctx.config.prompts.recent_limit);
        match label {
            Some(label) => {
                let template = library.select_by_label(label).ok_or_else(|| {
                    PopAskError::InvalidPrompt(format!("No prompt named '{}'", label))
                })?;
                library.save(store);
                Ok(template)
            }
            None => Ok(library.selected().to_string()),
        }
    }
}

// Selection capture handler
pub mod capture {
    //! Feeds a selection through the event bus and the selection binder,
    //! the same path a hotkey capture takes.

    use super::*;
    use crate::chat::{ChatSession, DispatchOutcome};
    use crate::providers::create_provider;
    use crate::selection::{
        EventBus, HeadlessWindow, SelectionBinder, SelectionEvent, SelectionOutcome, TesseractOcr,
        GET_SELECTION,
    };

    /// Capture `text` (or recognize the image at `text` with `ocr`)
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `text` - Selected text, or an image path with `ocr`
    /// * `ocr` - Run OCR on the image at `text`
    /// * `prompt` - Label of the prompt to use for plain text
    /// * `no_send` - Stage the formatted input instead of sending it
    pub async fn run_capture(
        config: Config,
        text: String,
        ocr: bool,
        prompt: Option<String>,
        no_send: bool,
    ) -> Result<()> {
        let ctx = open_context(config)?;
        let template = super::ask::resolve_template(&ctx, prompt.as_deref())?;
        let engine = TesseractOcr::new(ctx.config.selection.tesseract_path.clone());
        let provider = create_provider(&ctx.config.endpoint)?;

        let session = Arc::new(ChatSession::new(ctx, provider));
        let binder = SelectionBinder::new(session.clone(), Arc::new(engine), Arc::new(HeadlessWindow));

        let bus = EventBus::new();
        let mut subscription = bus.on(GET_SELECTION);
        bus.emit(
            GET_SELECTION,
            SelectionEvent {
                text,
                prompt: template,
                auto_asking: !no_send,
                is_ocr: ocr,
                ..SelectionEvent::default()
            },
        );

        if let Some(event) = subscription.try_recv() {
            match binder.on_selection(event).await {
                SelectionOutcome::Staged(input) => println!("{}", input),
                SelectionOutcome::Dispatched(DispatchOutcome::Completed(reply)) => {
                    println!("{}", reply.content)
                }
                SelectionOutcome::Empty => println!("Nothing to ask."),
                other => tracing::debug!("Capture ended with {:?}", other),
            }
        }

        session.new_chat();
        Ok(())
    }
}
