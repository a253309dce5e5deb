use std::{path::Path, sync::Arc};

use chrono::DateTime;
use libsql::{Builder, Connection, Row};

use crate::state::{Chat, ChatMessage, Contact, Moderation};

/// Columns shared by every message query, sender resolved through `contacts`.
const MESSAGE_COLUMNS: &str = r"
    m.id, m.chat_jid, m.media_type, m.content, m.blocked_by_recipient,
    m.deleted_by_creator, m.timestamp, c.jid, c.name, c.is_me
";

/// Local message store backing the chat screen.
#[derive(Clone, Debug)]
pub struct Database {
    // Owns the storage `conn` talks to.
    #[allow(dead_code)]
    db: Arc<libsql::Database>,
    conn: Arc<Connection>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, libsql::Error> {
        let path = path.as_ref();

        // Create parent directory.
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let db = Arc::new(Builder::new_local(path).build().await?);
        Self::from_database(db).await
    }

    /// Open a throwaway in-memory database.
    pub async fn in_memory() -> Result<Self, libsql::Error> {
        let db = Arc::new(Builder::new_local(":memory:").build().await?);
        Self::from_database(db).await
    }

    async fn from_database(db: Arc<libsql::Database>) -> Result<Self, libsql::Error> {
        let conn = Arc::new(db.connect()?);

        let this = Self { db, conn };
        this.init_tables().await?;

        Ok(this)
    }

    /// Initialize the database tables.
    async fn init_tables(&self) -> Result<(), libsql::Error> {
        // Chats.
        self.conn
            .execute(
                r"
            CREATE TABLE IF NOT EXISTS chats (
                jid TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                last_message_time INTEGER
            )
            ",
                (),
            )
            .await?;

        // Messages.
        self.conn
            .execute(
                r"
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                chat_jid TEXT NOT NULL,
                sender_jid TEXT,
                content TEXT NOT NULL DEFAULT '',
                media_type TEXT NOT NULL,
                blocked_by_recipient INTEGER DEFAULT 0,
                deleted_by_creator INTEGER DEFAULT 0,
                timestamp INTEGER NOT NULL
            )
            ",
                (),
            )
            .await?;

        // Contacts.
        self.conn
            .execute(
                r"
            CREATE TABLE IF NOT EXISTS contacts (
                jid TEXT PRIMARY KEY,
                name TEXT,
                is_me INTEGER DEFAULT 0
            )
            ",
                (),
            )
            .await?;

        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_jid, timestamp)",
                (),
            )
            .await?;

        Ok(())
    }
}

/// Chat operations.
impl Database {
    pub async fn save_chat(&self, chat: &Chat) -> Result<(), libsql::Error> {
        self.conn
            .execute(
                r"
            INSERT INTO chats (jid, name, last_message_time)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(jid) DO UPDATE SET
                name = excluded.name,
                last_message_time = excluded.last_message_time
            ",
                libsql::params![
                    chat.jid.clone(),
                    chat.name.clone(),
                    chat.last_message_time.timestamp()
                ],
            )
            .await?;

        Ok(())
    }

    pub async fn load_chat(&self, jid: &str) -> Result<Option<Chat>, libsql::Error> {
        let mut rows = self
            .conn
            .query(
                "SELECT jid, name, last_message_time FROM chats WHERE jid = ?1 LIMIT 1",
                [jid],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Chat {
                jid: row.get(0)?,
                name: row.get(1)?,
                last_message_time: row
                    .get::<Option<i64>>(2)?
                    .and_then(|t| DateTime::from_timestamp(t, 0))
                    .unwrap_or_default(),

                db: Arc::new(self.clone()),
            }))
        } else {
            Ok(None)
        }
    }
}

/// Message operations.
impl Database {
    /// Insert or update a message. The sender is stored by JID only.
    pub async fn save_message(&self, msg: &ChatMessage) -> Result<(), libsql::Error> {
        self.conn
            .execute(
                r"
            INSERT INTO messages (id, chat_jid, sender_jid, content, media_type,
                                  blocked_by_recipient, deleted_by_creator, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                blocked_by_recipient = excluded.blocked_by_recipient,
                deleted_by_creator = excluded.deleted_by_creator
            ",
                libsql::params![
                    msg.id.clone(),
                    msg.chat_jid.clone(),
                    msg.sender.as_ref().map(|s| s.jid.clone()),
                    msg.content.clone(),
                    msg.media_type.clone(),
                    i32::from(msg.moderation.blocked_by_recipient),
                    i32::from(msg.moderation.deleted_by_creator),
                    msg.timestamp.timestamp()
                ],
            )
            .await?;

        // Update chat's last_message_time.
        self.conn
            .execute(
                "UPDATE chats SET last_message_time = ?1 WHERE jid = ?2",
                libsql::params![msg.timestamp.timestamp(), msg.chat_jid.clone()],
            )
            .await?;

        Ok(())
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<(), libsql::Error> {
        self.conn
            .execute("DELETE FROM messages WHERE id = ?1", [message_id])
            .await?;

        Ok(())
    }

    /// Flag a message as withdrawn by its author.
    pub async fn mark_recalled(&self, message_id: &str) -> Result<(), libsql::Error> {
        self.conn
            .execute(
                "UPDATE messages SET deleted_by_creator = 1 WHERE id = ?1",
                [message_id],
            )
            .await?;

        Ok(())
    }

    /// Number of messages in a chat, section markers included.
    pub async fn count_messages(&self, chat_jid: &str) -> Result<usize, libsql::Error> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM messages WHERE chat_jid = ?1", [chat_jid])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(usize::try_from(row.get::<u64>(0)?).unwrap_or(0))
        } else {
            Ok(0)
        }
    }

    /// Load up to `limit` messages of a chat starting at position `offset`.
    ///
    /// Positions follow the chat's order, oldest first. Messages sharing a
    /// timestamp keep their insertion order.
    pub async fn load_message_range(
        &self,
        chat_jid: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, libsql::Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut rows = self
            .conn
            .query(
                &format!(
                    r"
            SELECT {MESSAGE_COLUMNS}
            FROM messages m
            LEFT JOIN contacts c ON c.jid = m.sender_jid
            WHERE m.chat_jid = ?1
            ORDER BY m.timestamp ASC, m.rowid ASC
            LIMIT ?2 OFFSET ?3
            "
                ),
                libsql::params![
                    chat_jid,
                    i64::try_from(limit).unwrap_or(i64::MAX),
                    i64::try_from(offset).unwrap_or(i64::MAX)
                ],
            )
            .await?;

        let mut messages = Vec::with_capacity(limit.min(256));
        while let Some(row) = rows.next().await? {
            messages.push(self.message_from_row(&row)?);
        }

        Ok(messages)
    }

    pub async fn load_message(&self, message_id: &str) -> Result<Option<ChatMessage>, libsql::Error> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    r"
            SELECT {MESSAGE_COLUMNS}
            FROM messages m
            LEFT JOIN contacts c ON c.jid = m.sender_jid
            WHERE m.id = ?1
            "
                ),
                [message_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            self.message_from_row(&row).map(Some)
        } else {
            Ok(None)
        }
    }

    fn message_from_row(&self, row: &Row) -> Result<ChatMessage, libsql::Error> {
        // A NULL contact JID means the sender didn't resolve.
        let sender = match row.get::<Option<String>>(7)? {
            Some(jid) => Some(Contact {
                jid,
                name: row.get::<Option<String>>(8)?.unwrap_or_default(),
                is_me: row.get::<i32>(9)? != 0,
            }),
            None => None,
        };

        let timestamp = DateTime::from_timestamp(row.get::<i64>(6)?, 0)
            .ok_or(libsql::Error::InvalidColumnType)?;

        Ok(ChatMessage {
            id: row.get(0)?,
            chat_jid: row.get(1)?,
            sender,

            media_type: row.get(2)?,
            content: row.get(3)?,
            moderation: Moderation {
                blocked_by_recipient: row.get::<i32>(4)? != 0,
                deleted_by_creator: row.get::<i32>(5)? != 0,
            },
            timestamp,

            db: Arc::new(self.clone()),
        })
    }
}

/// Contact operations.
impl Database {
    pub async fn save_contact(&self, contact: &Contact) -> Result<(), libsql::Error> {
        self.conn
            .execute(
                r"
            INSERT INTO contacts (jid, name, is_me)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(jid) DO UPDATE SET
                name = excluded.name,
                is_me = excluded.is_me
            ",
                libsql::params![
                    contact.jid.clone(),
                    contact.name.clone(),
                    i32::from(contact.is_me)
                ],
            )
            .await?;

        Ok(())
    }

    /// The contact marked as the current user, if any.
    pub async fn self_contact(&self) -> Result<Option<Contact>, libsql::Error> {
        let mut rows = self
            .conn
            .query("SELECT jid, name, is_me FROM contacts WHERE is_me = 1 LIMIT 1", ())
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Contact {
                jid: row.get(0)?,
                name: row.get::<Option<String>>(1)?.unwrap_or_default(),
                is_me: true,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn get_contact(&self, jid: &str) -> Result<Option<Contact>, libsql::Error> {
        let mut rows = self
            .conn
            .query("SELECT jid, name, is_me FROM contacts WHERE jid = ?1", [jid])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Contact {
                jid: row.get(0)?,
                name: row.get::<Option<String>>(1)?.unwrap_or_default(),
                is_me: row.get::<i32>(2)? != 0,
            }))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::state::MediaKind;

    pub(crate) const CHAT: &str = "123@s.whatsapp.net";
    pub(crate) const ME: &str = "me@s.whatsapp.net";

    pub(crate) async fn seeded(count: usize) -> Database {
        let db = Database::in_memory().await.unwrap();
        db.save_contact(&Contact {
            jid: CHAT.into(),
            name: "Alice".into(),
            is_me: false,
        })
        .await
        .unwrap();
        db.save_contact(&Contact {
            jid: ME.into(),
            name: "Me".into(),
            is_me: true,
        })
        .await
        .unwrap();

        for i in 0..count {
            let sender = if i % 2 == 0 { CHAT } else { ME };
            insert(&db, &format!("m{i:03}"), Some(sender), MediaKind::Text.as_str(), i).await;
        }

        db
    }

    pub(crate) async fn insert(
        db: &Database,
        id: &str,
        sender_jid: Option<&str>,
        media_type: &str,
        second: usize,
    ) {
        let sender = match sender_jid {
            Some(jid) => db.get_contact(jid).await.unwrap().or(Some(Contact {
                jid: jid.into(),
                name: String::new(),
                is_me: false,
            })),
            None => None,
        };

        let message = ChatMessage {
            id: id.into(),
            chat_jid: CHAT.into(),
            sender,
            media_type: media_type.into(),
            content: format!("content of {id}"),
            moderation: Moderation::default(),
            timestamp: Utc
                .timestamp_opt(1_700_000_000 + i64::try_from(second).unwrap(), 0)
                .unwrap(),
            db: Arc::new(db.clone()),
        };
        message.save().await.unwrap();
    }

    #[tokio::test]
    async fn counts_messages_per_chat() {
        let db = seeded(7).await;
        assert_eq!(db.count_messages(CHAT).await.unwrap(), 7);
        assert_eq!(db.count_messages("other@s.whatsapp.net").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn range_is_ordered_oldest_first() {
        let db = seeded(10).await;

        let ids: Vec<String> = db
            .load_message_range(CHAT, 3, 4)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["m003", "m004", "m005", "m006"]);

        let tail = db.load_message_range(CHAT, 8, 20).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert!(db.load_message_range(CHAT, 0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolves_known_senders_only() {
        let db = seeded(2).await;
        insert(&db, "stranger", Some("nobody@s.whatsapp.net"), "text", 50).await;
        insert(&db, "anonymous", None, "text", 51).await;

        let messages = db.load_message_range(CHAT, 0, 10).await.unwrap();
        assert_eq!(messages[0].sender.as_ref().map(|s| s.name.as_str()), Some("Alice"));
        assert!(messages[1].is_outgoing());
        assert!(messages[2].sender.is_none());
        assert!(messages[3].sender.is_none());
    }

    #[tokio::test]
    async fn keeps_undecodable_media_types() {
        let db = seeded(0).await;
        insert(&db, "odd", Some(CHAT), "hologram", 1).await;

        let message = db.load_message("odd").await.unwrap().unwrap();
        assert_eq!(message.media_type, "hologram");
        assert!(message.media_kind().is_err());
    }

    #[tokio::test]
    async fn recall_and_delete() {
        let db = seeded(3).await;

        db.mark_recalled("m000").await.unwrap();
        let recalled = db.load_message("m000").await.unwrap().unwrap();
        assert!(recalled.moderation.deleted_by_creator);

        db.delete_message("m001").await.unwrap();
        assert_eq!(db.count_messages(CHAT).await.unwrap(), 2);
        assert!(db.load_message("m001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn nameless_contacts_still_resolve() {
        let db = seeded(0).await;
        db.conn
            .execute(
                "INSERT INTO contacts (jid, name) VALUES ('anon@s.whatsapp.net', NULL)",
                (),
            )
            .await
            .unwrap();
        insert(&db, "quiet", Some("anon@s.whatsapp.net"), "text", 1).await;

        let message = db.load_message("quiet").await.unwrap().unwrap();
        let sender = message.sender.unwrap();
        assert_eq!(sender.jid, "anon@s.whatsapp.net");
        assert!(sender.name.is_empty());
    }

    #[tokio::test]
    async fn unreadable_timestamps_are_errors() {
        let db = seeded(1).await;
        db.conn
            .execute(
                "INSERT INTO messages (id, chat_jid, media_type, timestamp) VALUES ('bad', ?1, 'text', ?2)",
                libsql::params![CHAT, i64::MAX],
            )
            .await
            .unwrap();

        assert!(db.load_message("bad").await.is_err());
        assert!(db.load_message_range(CHAT, 0, 10).await.is_err());
        assert!(db.load_message("m000").await.unwrap().is_some());
    }
}
