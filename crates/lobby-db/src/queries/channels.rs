use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use lobby_types::models::{ChannelKind, Role};

use super::{CHANNEL_COLUMNS, LATEST_MESSAGE_SEQ, channel_at};
use crate::models::{ChannelRow, ChannelSummaryRow, SubChannelRow};
use crate::{Database, new_id, timestamp};

/// Name of the sub-channel every channel starts with.
pub const DEFAULT_SUBCHANNEL_NAME: &str = "general";

const SUBCHANNEL_COLUMNS: &str =
    "id, name, channel_id, is_token_gated, token_address, is_default, created_at";

impl Database {
    // -- Channels --

    /// Creates the channel, its default sub-channel and the creator's owner
    /// membership in one transaction.
    pub fn create_channel(&self, name: &str, kind: ChannelKind, creator_id: &str) -> Result<ChannelRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = timestamp();
            let channel_id = new_id();
            let subchannel_id = new_id();

            tx.execute(
                "INSERT INTO channels (id, name, kind, creator_id, default_subchannel_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![channel_id, name, kind.as_str(), creator_id, subchannel_id, now],
            )?;
            tx.execute(
                "INSERT INTO subchannels (id, name, channel_id, is_token_gated, is_default, created_at)
                 VALUES (?1, ?2, ?3, 0, 1, ?4)",
                rusqlite::params![subchannel_id, DEFAULT_SUBCHANNEL_NAME, channel_id, now],
            )?;
            tx.execute(
                &format!(
                    "INSERT INTO memberships (id, user_id, channel_id, role, last_read_at, last_read_seq, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, {LATEST_MESSAGE_SEQ}, ?5)"
                ),
                rusqlite::params![new_id(), creator_id, channel_id, Role::Owner.as_str(), now],
            )?;

            let channel = query_channel(&tx, &channel_id)?
                .ok_or_else(|| anyhow::anyhow!("Channel {} missing after insert", channel_id))?;
            tx.commit()?;

            info!("Channel {} ({}) created by {}", channel.name, channel.id, creator_id);
            Ok(channel)
        })
    }

    pub fn get_channel(&self, id: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, id))
    }

    pub fn count_members(&self, channel_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM memberships WHERE channel_id = ?1",
                [channel_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Channels `user_id` belongs to, with the count of messages posted after
    /// its read marker. Own messages never count as unread.
    pub fn list_channels_for_user(&self, user_id: &str) -> Result<Vec<ChannelSummaryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CHANNEL_COLUMNS}, mb.role, mb.last_read_at,
                        (SELECT COUNT(*)
                           FROM messages m
                           JOIN subchannels s ON s.id = m.subchannel_id
                          WHERE s.channel_id = c.id
                            AND m.user_id != mb.user_id
                            AND m.rowid > mb.last_read_seq)
                 FROM memberships mb
                 JOIN channels c ON c.id = mb.channel_id
                 WHERE mb.user_id = ?1
                 ORDER BY c.created_at, c.rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChannelSummaryRow {
                        channel: channel_at(row, 0)?,
                        role: row.get(6)?,
                        last_read_at: row.get(7)?,
                        unread_count: row.get::<_, i64>(8)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Sub-channels --

    pub fn create_subchannel(
        &self,
        channel_id: &str,
        name: &str,
        is_token_gated: bool,
        token_address: Option<&str>,
    ) -> Result<SubChannelRow> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO subchannels (id, name, channel_id, is_token_gated, token_address, is_default, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                 RETURNING {SUBCHANNEL_COLUMNS}"
            );
            let row = conn.query_row(
                &sql,
                rusqlite::params![new_id(), name, channel_id, is_token_gated, token_address, timestamp()],
                subchannel_from_row,
            )?;
            Ok(row)
        })
    }

    pub fn get_subchannel(&self, id: &str) -> Result<Option<SubChannelRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {SUBCHANNEL_COLUMNS} FROM subchannels WHERE id = ?1");
            let row = conn.query_row(&sql, [id], subchannel_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn subchannel_name_taken(&self, channel_id: &str, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let taken = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM subchannels WHERE channel_id = ?1 AND name = ?2)",
                [channel_id, name],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    /// Default sub-channel first, then creation order.
    pub fn list_subchannels(&self, channel_id: &str) -> Result<Vec<SubChannelRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SUBCHANNEL_COLUMNS} FROM subchannels
                 WHERE channel_id = ?1
                 ORDER BY is_default DESC, created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([channel_id], subchannel_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_channel(conn: &Connection, id: &str) -> Result<Option<ChannelRow>> {
    let sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.id = ?1");
    let row = conn.query_row(&sql, [id], |row| channel_at(row, 0)).optional()?;
    Ok(row)
}

fn subchannel_from_row(row: &Row<'_>) -> rusqlite::Result<SubChannelRow> {
    Ok(SubChannelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        channel_id: row.get(2)?,
        is_token_gated: row.get(3)?,
        token_address: row.get(4)?,
        is_default: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::testutil;

    #[test]
    fn new_channel_has_default_subchannel_and_owner() {
        let db = Database::open_in_memory().unwrap();
        let owner = testutil::user(&db, "0xowner");
        let channel = testutil::channel(&db, &owner, ChannelKind::Private);

        assert_eq!(channel.kind, "private");
        let subchannels = db.list_subchannels(&channel.id).unwrap();
        assert_eq!(subchannels.len(), 1);
        assert!(subchannels[0].is_default);
        assert_eq!(subchannels[0].name, DEFAULT_SUBCHANNEL_NAME);
        assert_eq!(channel.default_subchannel_id.as_deref(), Some(subchannels[0].id.as_str()));

        let membership = db.get_membership(&owner.id, &channel.id).unwrap().unwrap();
        assert_eq!(membership.role, "owner");
        assert_eq!(db.count_members(&channel.id).unwrap(), 1);
    }

    #[test]
    fn unknown_creator_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_channel("ghost", ChannelKind::Public, "nobody").is_err());

        let channels: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM channels", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(channels, 0);
    }

    #[test]
    fn subchannels_list_default_first() {
        let db = Database::open_in_memory().unwrap();
        let owner = testutil::user(&db, "0xowner");
        let channel = testutil::channel(&db, &owner, ChannelKind::Public);

        let gated = db
            .create_subchannel(&channel.id, "holders", true, Some("So1anaMint"))
            .unwrap();
        assert!(gated.is_token_gated);
        assert!(db.subchannel_name_taken(&channel.id, "holders").unwrap());
        assert!(!db.subchannel_name_taken(&channel.id, "other").unwrap());

        let names: Vec<String> = db
            .list_subchannels(&channel.id)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["general", "holders"]);
    }

    #[test]
    fn unread_count_skips_own_and_read_messages() {
        let db = Database::open_in_memory().unwrap();
        let owner = testutil::user(&db, "0xowner");
        let guest = testutil::user(&db, "0xguest");
        let channel = testutil::channel(&db, &owner, ChannelKind::Public);
        let general = channel.default_subchannel_id.clone().unwrap();
        db.add_membership(&guest.id, &channel.id, Role::Member).unwrap();
        db.insert_message(&general, &owner.id, "mine").unwrap();
        db.insert_message(&general, &guest.id, "theirs").unwrap();

        let summaries = db.list_channels_for_user(&owner.id).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].unread_count, 1);

        db.mark_read(&owner.id, &channel.id).unwrap();
        let summaries = db.list_channels_for_user(&owner.id).unwrap();
        assert_eq!(summaries[0].unread_count, 0);
    }

    #[test]
    fn message_right_after_mark_read_is_unread() {
        let db = Database::open_in_memory().unwrap();
        let owner = testutil::user(&db, "0xowner");
        let guest = testutil::user(&db, "0xguest");
        let channel = testutil::channel(&db, &owner, ChannelKind::Public);
        let general = channel.default_subchannel_id.clone().unwrap();
        db.add_membership(&guest.id, &channel.id, Role::Member).unwrap();

        // Back to back, so both usually share one millisecond timestamp.
        db.mark_read(&owner.id, &channel.id).unwrap();
        db.insert_message(&general, &guest.id, "just in").unwrap();

        let summaries = db.list_channels_for_user(&owner.id).unwrap();
        assert_eq!(summaries[0].unread_count, 1);
    }
}
