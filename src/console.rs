//! Line commands driving the chat screen from a terminal.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use chrono::{Duration, TimeZone, Utc};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::mpsc::UnboundedSender,
};

use crate::{
    components::{ChatViewInput, ScrollState, cell::MenuAction},
    state::{Chat, ChatMessage, Contact, MediaKind, Moderation},
    store::Database,
};

/// A parsed console line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Drag the list at its top edge.
    Top,
    /// Fling the list into its top edge.
    Fling,
    /// Receive a text message from the chat's contact.
    Receive(String),
    /// Send a text message as the current user.
    Send(String),
    Tap(usize),
    Menu(usize),
    Action(usize, MenuAction),
    Quit,
}

pub const USAGE: &str =
    "commands: top | fling | recv <text> | send <text> | tap <row> | menu <row> | \
     recall|hide|report|delete <row> | quit";

impl Command {
    /// Parse one console line. Returns `None` for blank or unknown lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let row = || rest.parse::<usize>().ok();

        let command = match cmd.to_lowercase().as_str() {
            "top" => Self::Top,
            "fling" => Self::Fling,
            "recv" if !rest.is_empty() => Self::Receive(rest.to_string()),
            "send" if !rest.is_empty() => Self::Send(rest.to_string()),
            "tap" => Self::Tap(row()?),
            "menu" => Self::Menu(row()?),
            "recall" => Self::Action(row()?, MenuAction::Recall),
            "hide" => Self::Action(row()?, MenuAction::Hide),
            "report" => Self::Action(row()?, MenuAction::Report),
            "delete" => Self::Action(row()?, MenuAction::Delete),
            "quit" | "q" => Self::Quit,
            _ => return None,
        };

        Some(command)
    }
}

/// Feeds console commands into the chat screen until `quit` or end of input.
pub struct Console {
    db: Database,
    chat_jid: String,
    inputs: UnboundedSender<ChatViewInput>,
    next_id: AtomicU64,
}

impl Console {
    pub fn new(db: Database, chat_jid: String, inputs: UnboundedSender<ChatViewInput>) -> Self {
        Self {
            db,
            chat_jid,
            inputs,
            next_id: AtomicU64::new(0),
        }
    }

    /// Read stdin line by line.
    pub async fn run(self) {
        self.run_with(BufReader::new(tokio::io::stdin())).await;
    }

    async fn run_with<R: AsyncBufRead + Unpin>(self, reader: R) {
        let mut lines = reader.lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(command) = Command::parse(&line) else {
                        if !line.trim().is_empty() {
                            tracing::warn!("Unknown command: {line}. {USAGE}");
                        }
                        continue;
                    };

                    if !self.execute(command).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {e}");
                    break;
                }
            }
        }

        if self.inputs.send(ChatViewInput::Close).is_err() {
            tracing::debug!("Chat screen already gone");
        }
    }

    /// Run a command. Returns `false` once the screen should close.
    async fn execute(&self, command: Command) -> bool {
        let input = match command {
            Command::Top => ChatViewInput::Scrolled(ScrollState {
                at_top: true,
                dragging: true,
                decelerating: false,
            }),
            Command::Fling => ChatViewInput::Scrolled(ScrollState {
                at_top: true,
                dragging: false,
                decelerating: true,
            }),
            Command::Receive(text) => {
                let sender = self.db.get_contact(&self.chat_jid).await.ok().flatten();
                self.store_text(sender, text).await;
                ChatViewInput::StoreChanged
            }
            Command::Send(text) => {
                match self.db.self_contact().await {
                    Ok(Some(me)) => self.store_text(Some(me), text).await,
                    Ok(None) => tracing::warn!("No contact is marked as the current user"),
                    Err(e) => tracing::error!("Failed to load the current user: {e}"),
                }
                ChatViewInput::StoreChanged
            }
            Command::Tap(row) => ChatViewInput::TapImage(row),
            Command::Menu(row) => ChatViewInput::ShowMenu(row),
            Command::Action(row, action) => ChatViewInput::PerformAction { row, action },
            Command::Quit => return false,
        };

        self.inputs.send(input).is_ok()
    }

    async fn store_text(&self, sender: Option<Contact>, text: String) {
        let now = Utc::now();
        let id = format!(
            "local-{}-{}",
            now.timestamp_millis(),
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );

        let message = ChatMessage {
            id,
            chat_jid: self.chat_jid.clone(),
            sender,
            media_type: MediaKind::Text.as_str().to_string(),
            content: text,
            moderation: Moderation::default(),
            timestamp: now,
            db: Arc::new(self.db.clone()),
        };

        if let Err(e) = message.save().await {
            tracing::error!("Failed to save message: {e}");
        }
    }
}

/// Fill `db` with a demo conversation exercising every kind of row.
pub async fn seed_demo(db: &Database, chat_jid: &str) -> Result<Chat, libsql::Error> {
    let friend = Contact {
        jid: chat_jid.to_string(),
        name: "Ada Lovelace".into(),
        is_me: false,
    };
    let me = Contact {
        jid: "me@s.whatsapp.net".into(),
        name: "Me".into(),
        is_me: true,
    };
    db.save_contact(&friend).await?;
    db.save_contact(&me).await?;

    let chat = Chat {
        jid: chat_jid.to_string(),
        name: friend.name.clone(),
        last_message_time: Utc::now(),
        db: Arc::new(db.clone()),
    };
    chat.save().await?;

    let start = Utc
        .with_ymd_and_hms(2016, 6, 16, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    for i in 0..48_i64 {
        let (media_type, sender, moderation) = match i {
            _ if i % 12 == 0 => (MediaKind::SectionDate.as_str(), None, Moderation::default()),
            7 => (MediaKind::Image.as_str(), Some(&friend), Moderation::default()),
            15 => (MediaKind::Audio.as_str(), Some(&me), Moderation::default()),
            21 => (
                MediaKind::Text.as_str(),
                Some(&friend),
                Moderation {
                    deleted_by_creator: true,
                    ..Moderation::default()
                },
            ),
            30 => (
                MediaKind::Text.as_str(),
                None,
                Moderation {
                    blocked_by_recipient: true,
                    ..Moderation::default()
                },
            ),
            33 => ("hologram", Some(&friend), Moderation::default()),
            38 => (MediaKind::Location.as_str(), Some(&friend), Moderation::default()),
            44 => (MediaKind::Image.as_str(), Some(&me), Moderation::default()),
            _ if i % 3 == 0 => (MediaKind::Text.as_str(), Some(&me), Moderation::default()),
            _ => (MediaKind::Text.as_str(), Some(&friend), Moderation::default()),
        };

        let message = ChatMessage {
            id: format!("demo-{i:03}"),
            chat_jid: chat_jid.to_string(),
            sender: sender.cloned(),
            media_type: media_type.to_string(),
            content: format!("message #{i}"),
            moderation,
            timestamp: start + Duration::hours(i * 2),
            db: Arc::new(db.clone()),
        };
        message.save().await?;
    }

    tracing::info!("Seeded demo chat {chat_jid}");
    Ok(chat)
}
