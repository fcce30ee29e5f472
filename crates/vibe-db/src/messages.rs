use anyhow::Result;
use rusqlite::Connection;

use crate::models::MessageRow;
use crate::{Database, OptionalExt};

impl Database {
    /// Conversation shared by the pair, matching participants in either order.
    pub fn find_conversation(&self, user_a: &str, user_b: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let id: Option<String> = conn
                .query_row(
                    "SELECT id FROM conversations
                     WHERE (participant_a = ?1 AND participant_b = ?2)
                        OR (participant_a = ?2 AND participant_b = ?1)",
                    (user_a, user_b),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    pub fn create_conversation(&self, id: &str, user_a: &str, user_b: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (id, participant_a, participant_b) VALUES (?1, ?2, ?3)",
                (id, user_a, user_b),
            )?;
            Ok(())
        })
    }

    pub fn insert_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, body)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, conversation_id, sender_id, receiver_id, body),
            )?;
            Ok(())
        })
    }

    pub fn get_conversation_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, conversation_id))
    }
}

fn query_messages(conn: &Connection, conversation_id: &str) -> Result<Vec<MessageRow>> {
    // rowid breaks ties between messages stored within the same second
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender_id, receiver_id, body, created_at
         FROM messages
         WHERE conversation_id = ?1
         ORDER BY created_at, rowid",
    )?;

    let rows = stmt
        .query_map([conversation_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                sender_id: row.get(2)?,
                receiver_id: row.get(3)?,
                body: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
