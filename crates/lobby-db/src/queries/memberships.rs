use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use lobby_types::models::Role;

use super::{LATEST_MESSAGE_SEQ, MEMBERSHIP_COLUMNS, USER_COLUMNS, membership_at, user_at};
use crate::models::{MemberRow, MembershipRow};
use crate::{Database, new_id, timestamp};

impl Database {
    pub fn get_membership(&self, user_id: &str, channel_id: &str) -> Result<Option<MembershipRow>> {
        self.with_conn(|conn| query_membership(conn, user_id, channel_id))
    }

    /// Inserts a membership unless one exists.
    /// Returns the membership and whether it was created by this call.
    pub fn add_membership(&self, user_id: &str, channel_id: &str, role: Role) -> Result<(MembershipRow, bool)> {
        self.with_conn(|conn| insert_membership(conn, user_id, channel_id, role))
    }

    /// Members of a channel with their users, in join order.
    pub fn list_members(&self, channel_id: &str) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MEMBERSHIP_COLUMNS}, {USER_COLUMNS}
                 FROM memberships mb
                 JOIN users u ON u.id = mb.user_id
                 WHERE mb.channel_id = ?1
                 ORDER BY mb.created_at, mb.rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([channel_id], |row| {
                    Ok(MemberRow {
                        membership: membership_at(row, 0)?,
                        user: user_at(row, 6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when there was no membership to remove.
    pub fn remove_membership(&self, user_id: &str, channel_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM memberships WHERE user_id = ?1 AND channel_id = ?2",
                [user_id, channel_id],
            )?;
            Ok(removed > 0)
        })
    }

    /// Moves the read marker to the newest message and `last_read_at` to now.
    /// `None` if the user is not a member.
    pub fn mark_read(&self, user_id: &str, channel_id: &str) -> Result<Option<MembershipRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE memberships SET last_read_at = ?1, last_read_seq = {LATEST_MESSAGE_SEQ}
                 WHERE user_id = ?2 AND channel_id = ?3
                 RETURNING id, user_id, channel_id, role, last_read_at, created_at"
            );
            let row = conn
                .query_row(
                    &sql,
                    rusqlite::params![timestamp(), user_id, channel_id],
                    |row| membership_at(row, 0),
                )
                .optional()?;
            Ok(row)
        })
    }
}

pub(crate) fn query_membership(
    conn: &Connection,
    user_id: &str,
    channel_id: &str,
) -> Result<Option<MembershipRow>> {
    let sql = format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM memberships mb WHERE mb.user_id = ?1 AND mb.channel_id = ?2"
    );
    let row = conn
        .query_row(&sql, [user_id, channel_id], |row| membership_at(row, 0))
        .optional()?;
    Ok(row)
}

pub(crate) fn insert_membership(
    conn: &Connection,
    user_id: &str,
    channel_id: &str,
    role: Role,
) -> Result<(MembershipRow, bool)> {
    let now = timestamp();
    let inserted = conn.execute(
        &format!(
            "INSERT INTO memberships (id, user_id, channel_id, role, last_read_at, last_read_seq, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, {LATEST_MESSAGE_SEQ}, ?5)
             ON CONFLICT(user_id, channel_id) DO NOTHING"
        ),
        rusqlite::params![new_id(), user_id, channel_id, role.as_str(), now],
    )?;

    let membership = query_membership(conn, user_id, channel_id)?
        .ok_or_else(|| anyhow::anyhow!("Membership {}/{} missing after insert", user_id, channel_id))?;
    Ok((membership, inserted > 0))
}
