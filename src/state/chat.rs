use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{state::ChatMessage, store::Database};

/// A chat/conversation.
#[derive(Clone, Debug)]
pub struct Chat {
    /// JID (Jabbed ID) - unique chat identifier.
    pub jid: String,
    /// Display name.
    pub name: String,
    /// Time of the last sent message.
    pub last_message_time: DateTime<Utc>,

    pub db: Arc<Database>,
}

impl Chat {
    /// Insert or update the current chat in the database.
    pub async fn save(&self) -> Result<(), libsql::Error> {
        self.db.save_chat(self).await
    }

    /// Get the chat name or the bare JID user part if empty.
    pub fn get_name_or_jid(&self) -> &str {
        if self.name.is_empty() {
            self.jid.split('@').next().unwrap_or(&self.jid)
        } else {
            &self.name
        }
    }

    /// Count every message in this chat, section markers included.
    pub async fn count_messages(&self) -> Result<usize, libsql::Error> {
        self.db.count_messages(&self.jid).await
    }

    /// Load `limit` messages starting at `offset`, oldest first.
    pub async fn load_range(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, libsql::Error> {
        self.db.load_message_range(&self.jid, offset, limit).await
    }

    /// Get the last sent message in this chat.
    pub async fn get_last_message(&self) -> Result<Option<ChatMessage>, libsql::Error> {
        let count = self.count_messages().await?;
        if count == 0 {
            return Ok(None);
        }

        self.load_range(count - 1, 1).await.map(|mut m| m.pop())
    }
}
