use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::warn;

use super::{USER_COLUMNS, user_at};
use crate::models::MessageRow;
use crate::{Database, new_id, timestamp};

// Messages always come back joined with their author and the channel that
// owns their sub-channel.
fn message_select() -> String {
    format!(
        "SELECT m.id, m.content, m.user_id, m.subchannel_id, s.channel_id, m.read_by_users, m.created_at,
                {USER_COLUMNS}
         FROM messages m
         JOIN subchannels s ON s.id = m.subchannel_id
         JOIN users u ON u.id = m.user_id"
    )
}

impl Database {
    pub fn insert_message(&self, subchannel_id: &str, user_id: &str, content: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO messages (id, content, user_id, subchannel_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, content, user_id, subchannel_id, timestamp()],
            )?;
            query_message(conn, &id)?.ok_or_else(|| anyhow::anyhow!("Message {} missing after insert", id))
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Every message of a channel, optionally narrowed to one sub-channel,
    /// oldest first. Equal timestamps fall back to insertion order.
    pub fn list_channel_messages(
        &self,
        channel_id: &str,
        subchannel_id: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{}
                 WHERE s.channel_id = ?1 AND (?2 IS NULL OR m.subchannel_id = ?2)
                 ORDER BY m.created_at ASC, m.rowid ASC",
                message_select()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![channel_id, subchannel_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Records that `user_id` has read the message. Idempotent.
    /// `None` if the message does not exist.
    pub fn mark_message_read(&self, message_id: &str, user_id: &str) -> Result<Option<MessageRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut message) = query_message(&tx, message_id)? else {
                return Ok(None);
            };

            if !message.read_by_users.iter().any(|u| u == user_id) {
                message.read_by_users.push(user_id.to_string());
                tx.execute(
                    "UPDATE messages SET read_by_users = ?1 WHERE id = ?2",
                    rusqlite::params![serde_json::to_string(&message.read_by_users)?, message_id],
                )?;
            }
            tx.commit()?;
            Ok(Some(message))
        })
    }
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let sql = format!("{} WHERE m.id = ?1", message_select());
    let row = conn.query_row(&sql, [id], message_from_row).optional()?;
    Ok(row)
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    let id: String = row.get(0)?;
    let raw_read_by: String = row.get(5)?;
    let read_by_users = serde_json::from_str(&raw_read_by).unwrap_or_else(|e| {
        warn!("Corrupt read_by_users '{}' on message '{}': {}", raw_read_by, id, e);
        Vec::new()
    });

    Ok(MessageRow {
        content: row.get(1)?,
        user_id: row.get(2)?,
        subchannel_id: row.get(3)?,
        channel_id: row.get(4)?,
        read_by_users,
        created_at: row.get(6)?,
        user: user_at(row, 7)?,
        id,
    })
}
