//! Command-line interface parsing and handling.
//!
//! This module parses command-line arguments, resolves the runtime settings
//! from flags, configuration, and environment, and dispatches into the chat
//! loop or one of the utility subcommands.

pub mod say;

use std::env;
use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::core::app::{init_from, App, AppInit};
use crate::core::config::{Config, DEFAULT_BASE_URL};
use crate::ui::chat_loop::run_chat;

const MISSING_KEY_HELP: &str = "Error: OPENAI_API_KEY environment variable not set

Please set your API key:
export OPENAI_API_KEY=\"your-api-key-here\"

Optionally, you can also set a custom base URL:
export OPENAI_BASE_URL=\"https://api.openai.com/v1\"";

#[derive(Parser)]
#[command(name = "causette")]
#[command(about = "A terminal chat interface for OpenAI-compatible APIs")]
#[command(
    long_about = "Causette is a small full-screen terminal chat interface that streams \
replies from OpenAI-compatible APIs and keeps per-session conversation history in memory.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    Your API key (required)\n\
  OPENAI_BASE_URL   Custom API base URL (optional, defaults to https://api.openai.com/v1)\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Up/Down/Mouse     Scroll through chat history\n\
  Ctrl+C            Quit the application\n\n\
Commands:\n\
  /clear            Clear the conversation (all sessions)\n\
  /session [id]     Show or switch the active session\n\
  /log [filename]   Enable or toggle transcript logging\n\
  /help             Show extended help"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Session identifier to start in
    #[arg(short = 's', long, global = true, value_name = "SESSION")]
    pub session: Option<String>,

    /// Enable transcript logging to the given file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Stream a single reply to stdout and exit
    Say {
        /// The prompt to send
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g. default-model, session-id)
        key: String,
        /// Value to set
        value: String,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Show the current configuration
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            config.set_value(&key, &value)?;
            config.save()?;
            println!("{key} set to: {value}");
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            config.unset_value(&key)?;
            config.save()?;
            println!("{key} unset");
            Ok(())
        }
        Commands::Config => {
            Config::load()?.print_all();
            Ok(())
        }
        Commands::Say { prompt } => {
            let init = resolve_init(args.model, args.session, args.log)?;
            say::run_say(prompt, init).await
        }
        Commands::Chat => {
            let init = resolve_init(args.model, args.session, args.log)?;
            run_chat(App::new(init)).await
        }
    }
}

/// Resolves the startup settings. The API credential must be present in the
/// environment before anything else runs; missing it is a startup failure.
fn resolve_init(
    model: Option<String>,
    session: Option<String>,
    log: Option<String>,
) -> Result<AppInit, Box<dyn Error>> {
    let config = Config::load()?;

    let api_key = env::var("OPENAI_API_KEY").map_err(|_| MISSING_KEY_HELP)?;
    let base_url = env::var("OPENAI_BASE_URL")
        .ok()
        .or_else(|| config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    Ok(init_from(&config, api_key, base_url, model, session, log))
}
