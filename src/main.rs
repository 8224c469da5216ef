//! PopAsk - selection-to-chat assistant CLI
//!
#![doc = "PopAsk - selection-to-chat assistant CLI"]
#![doc = "Main entry point for the PopAsk application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use popask::cli::{Cli, Commands};
use popask::commands;
use popask::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    match cli.command {
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Ask { text, prompt } => {
            tracing::info!("Starting quick ask");
            commands::ask::run_ask(config, text, prompt).await?;
            Ok(())
        }
        Commands::Capture {
            text,
            ocr,
            prompt,
            no_send,
        } => {
            tracing::info!("Starting capture (ocr={}, send={})", ocr, !no_send);
            commands::capture::run_capture(config, text, ocr, prompt, no_send).await?;
            Ok(())
        }
        Commands::Usage => {
            commands::usage::handle_usage(config)?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            commands::history::handle_history(config, command)?;
            Ok(())
        }
        Commands::Prompts { command } => {
            commands::prompts::handle_prompts(config, command)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `POPASK_LOG` wins over `RUST_LOG`; `--verbose` raises the default to debug.
fn init_tracing(verbose: bool) {
    let default = if verbose { "popask=debug" } else { "popask=info" };
    let env_filter = EnvFilter::try_from_env("POPASK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
