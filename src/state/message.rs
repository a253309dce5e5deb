use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    state::{Contact, MediaKind},
    store::Database,
};

/// Moderation state attached to a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Moderation {
    /// The recipient blocked the sender; the message was never delivered.
    pub blocked_by_recipient: bool,
    /// The author withdrew the message after sending it.
    pub deleted_by_creator: bool,
}

/// A chat message.
#[derive(Clone, Debug)]
pub struct Message {
    /// Unique message identifier.
    pub id: String,
    /// JID (Jabbed ID) - unique chat identifier.
    pub chat_jid: String,
    /// Resolved sender, `None` when the sender is not a known contact.
    pub sender: Option<Contact>,

    /// Raw persisted media kind, see [`Message::media_kind`].
    pub media_type: String,
    /// Message text.
    pub content: String,
    /// Moderation flags.
    pub moderation: Moderation,
    /// When the message was sent/received.
    pub timestamp: DateTime<Utc>,

    pub db: Arc<Database>,
}

impl Message {
    /// Decode the persisted media kind.
    pub fn media_kind(&self) -> Result<MediaKind, strum::ParseError> {
        MediaKind::from_str(&self.media_type)
    }

    /// Whether this is user content. Undecodable kinds count as real.
    pub fn is_real(&self) -> bool {
        self.media_kind().map_or(true, MediaKind::is_real)
    }

    /// Whether the message was sent by the current user.
    pub fn is_outgoing(&self) -> bool {
        self.sender.as_ref().is_some_and(|s| s.is_me)
    }

    /// Insert or update the current message in the database.
    pub async fn save(&self) -> Result<(), libsql::Error> {
        self.db.save_message(self).await
    }
}
