use crate::chat::PromptLibrary;
use crate::cli::PromptCommand;
use crate::config::Config;
use crate::error::{PopAskError, Result};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle prompt template commands
pub fn handle_prompts(config: Config, command: PromptCommand) -> Result<()> {
    let ctx = super::open_context(config)?;
    let store = ctx.store.as_ref();
    let mut library = PromptLibrary::load(store, ctx.config.prompts.recent_limit);

    match command {
        PromptCommand::List => print_prompts(&library),
        PromptCommand::Select { label } => {
            library.select_by_label(&label).ok_or_else(|| {
                PopAskError::InvalidPrompt(format!("No prompt named '{}'", label))
            })?;
            library.save(store);
            println!("{}", format!("Selected prompt '{}'", label).green());
        }
        PromptCommand::Add { label, template } => {
            library.add(&label, &template)?;
            library.save(store);
            println!("{}", format!("Added prompt '{}'", label.trim()).green());
        }
        PromptCommand::Remove { label } => {
            if !library.remove(&label) {
                return Err(PopAskError::InvalidPrompt(format!("No prompt named '{}'", label)).into());
            }
            library.save(store);
            println!("{}", format!("Removed prompt '{}'", label).green());
        }
    }

    Ok(())
}

/// Print the prompt list, marking the selected one
pub fn print_prompts(library: &PromptLibrary) {
    if library.prompts().is_empty() {
        println!("{}", "No prompts defined.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["".bold(), "Label".bold(), "Template".bold()]);

    for prompt in library.prompts() {
        let marker = if prompt.value == library.selected() {
            "*".green()
        } else {
            "".normal()
        };
        table.add_row(prettytable::row![
            marker,
            prompt.label.cyan(),
            prompt.value.trim_end()
        ]);
    }

    println!("\nPrompts:");
    table.printstd();

    if !library.recent().is_empty() {
        let recent: Vec<&str> = library.recent().iter().map(|p| p.label.as_str()).collect();
        println!("Recent: {}", recent.join(", "));
    }
    println!();
}
