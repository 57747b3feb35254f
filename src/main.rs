//! Token Batch Bot - Main Entry Point
//!
//! Runs the bot conversation in the terminal: pick a server, point at a
//! credentials file, choose how many tokens to generate and receive the
//! token file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Confirm, Input, Select};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use token_batch_bot::config::ServiceSettings;
use token_batch_bot::console::ConsoleResponder;
use token_batch_bot::remote::HttpTokenClient;
use token_batch_bot::session::{Button, ChatEvent, ConversationHandler, SessionMode, UserId};

/// The console has a single user.
const CONSOLE_USER: UserId = UserId(0);

/// Chat bot that exchanges credential pairs for tokens.
#[derive(Parser, Debug)]
#[command(name = "token_bot")]
#[command(about = "Generate tokens for a file of uid/password pairs")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Override the token endpoint URL.
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory the delivered token file is copied into.
    #[arg(short, long, default_value = ".")]
    save_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let mut settings = ServiceSettings::from_env_with_defaults();
    if let Some(endpoint) = args.endpoint {
        settings.endpoint = endpoint;
    }
    settings
        .validate()
        .context("Service configuration validation failed")?;

    let client = HttpTokenClient::from_settings(&settings)
        .context("Failed to create token client")?;
    info!(
        "Using token endpoint {} (timeout {}s)",
        client.endpoint(),
        settings.request_timeout_secs
    );

    let handler = ConversationHandler::new(settings, client);
    let console = ConsoleResponder::new(&args.save_dir);

    handler
        .handle(CONSOLE_USER, ChatEvent::Start, &console)
        .await
        .context("Failed to start conversation")?;

    while let Some(event) = next_event(handler.mode(CONSOLE_USER).await, &console)? {
        handler
            .handle(CONSOLE_USER, event, &console)
            .await
            .context("Failed to deliver bot output")?;
    }

    info!("Goodbye");
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Asks the user for the next event. Returns `None` when they quit.
fn next_event(mode: SessionMode, console: &ConsoleResponder) -> Result<Option<ChatEvent>> {
    match mode {
        SessionMode::Idle | SessionMode::AwaitingServerChoice => choose_button(console),
        SessionMode::AwaitingFile => read_document().map(Some),
        SessionMode::AwaitingCount => {
            let text: String = Input::new()
                .with_prompt("Number of tokens")
                .interact_text()?;
            Ok(Some(ChatEvent::from_text(&text)))
        }
        SessionMode::Processing => {
            warn!("Conversation is still processing");
            Ok(None)
        }
    }
}

/// Offers the last keyboard's buttons, or a restart once there are none.
fn choose_button(console: &ConsoleResponder) -> Result<Option<ChatEvent>> {
    let buttons = console.take_choices();

    if buttons.is_empty() {
        let again = Confirm::new()
            .with_prompt("Start a new batch?")
            .default(true)
            .interact()?;
        return Ok(again.then_some(ChatEvent::Start));
    }

    let mut labels: Vec<&str> = buttons.iter().map(Button::label).collect();
    labels.push("Quit");

    let picked = Select::new()
        .with_prompt("Choose")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(buttons.get(picked).and_then(|button| match button {
        Button::Callback { data, .. } => ChatEvent::from_callback(data),
        Button::Url { .. } => None,
    }))
}

/// Reads a credentials file named by the user as an upload.
fn read_document() -> Result<ChatEvent> {
    loop {
        let path: String = Input::new()
            .with_prompt("Path to the credentials JSON file")
            .interact_text()?;
        let path = Path::new(path.trim());

        match std::fs::read(path) {
            Ok(bytes) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                return Ok(ChatEvent::Document { file_name, bytes });
            }
            Err(e) => eprintln!("✗ Could not read {}: {e}", path.display()),
        }
    }
}
