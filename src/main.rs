#![deny(clippy::all)]
#![deny(clippy::pedantic)]
// To keep consistency.
#![deny(clippy::use_self)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::equatable_if_let)]
#![deny(clippy::needless_collect)]
#![deny(clippy::useless_let_if_seq)]
#![deny(clippy::branches_sharing_code)]
#![deny(clippy::if_then_some_else_none)]
#![deny(clippy::semicolon_outside_block)]
#![deny(clippy::needless_pass_by_ref_mut)]
#![deny(clippy::empty_structs_with_brackets)]
#![deny(clippy::empty_enum_variants_with_brackets)]
// Use tracing crate.
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

//! chat-window - paged chat screen.
//!
//! Opens one chat from the local message database and renders it as text,
//! driven by commands read from stdin.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod application;
mod components;
mod config;
mod console;
mod state;
mod store;
mod utils;
mod window;

use std::{io, sync::Arc};

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use application::Application;
use config::{APP_ID, ChatViewSettings, VERSION};
use console::{Console, USAGE};
use state::Chat;
use store::Database;

/// Paged chat screen over a local message database.
#[derive(Parser, Debug)]
#[command(name = "chat-window")]
#[command(version, about, long_about = None)]
struct Args {
    /// Seed a demo conversation into an in-memory database
    #[arg(long)]
    demo: bool,

    /// JID of the chat to open
    chat_jid: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let Args { demo, chat_jid } = Args::parse();

    // Initialize logger.
    // Default to the INFO level for this crate and WARN for everything else.
    // It can be overridden with the RUST_LOG environment variable.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chat_window=info,warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_filter(env_filter))
        .init();

    tracing::info!("chat-window ({})", APP_ID);
    tracing::info!("Version: {}", VERSION);

    let (db, chat) = if demo {
        let db = Database::in_memory().await?;
        let chat = console::seed_demo(&db, &chat_jid).await?;
        (db, chat)
    } else {
        let path = config::database_path();
        tracing::info!("Opening {}", path.display());

        let db = Database::open(&path).await?;
        let chat = match db.load_chat(&chat_jid).await? {
            Some(chat) => chat,
            None => {
                tracing::warn!("Unknown chat {chat_jid}, starting an empty one");
                let chat = Chat {
                    jid: chat_jid.clone(),
                    name: String::new(),
                    last_message_time: Utc::now(),
                    db: Arc::new(db.clone()),
                };
                chat.save().await?;
                chat
            }
        };
        (db, chat)
    };

    match chat.get_last_message().await {
        Ok(Some(last)) => tracing::info!("Last message at {}", last.timestamp),
        Ok(None) => tracing::info!("No messages yet"),
        Err(e) => tracing::warn!("Failed to load the last message: {e}"),
    }

    let app = Application::new(db.clone(), ChatViewSettings::default(), io::stdout());
    let inputs = app.input_sender();
    inputs.send(components::ChatViewInput::Open(chat))?;

    tracing::info!("{USAGE}");
    tokio::spawn(Console::new(db, chat_jid, inputs).run());

    app.run().await?;

    Ok(())
}
