pub mod channels;
pub mod invites;
pub mod memberships;
pub mod messages;
pub mod users;

use rusqlite::Row;

use crate::models::{ChannelRow, MembershipRow, UserRow};

// Column lists shared by the query modules. Each `*_at` mapper reads the
// columns in this order starting at `base`, so joined queries can place
// several entities side by side in one row.

pub(crate) const USER_COLUMNS: &str =
    "u.id, u.wallet_address, u.email, u.name, u.online, u.last_seen, u.created_at";

pub(crate) const CHANNEL_COLUMNS: &str =
    "c.id, c.name, c.kind, c.creator_id, c.default_subchannel_id, c.created_at";

pub(crate) const MEMBERSHIP_COLUMNS: &str =
    "mb.id, mb.user_id, mb.channel_id, mb.role, mb.last_read_at, mb.created_at";

/// Newest message rowid; a read marker at this value covers every message so far.
pub(crate) const LATEST_MESSAGE_SEQ: &str = "(SELECT COALESCE(MAX(rowid), 0) FROM messages)";

pub(crate) fn user_at(row: &Row<'_>, base: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(base)?,
        wallet_address: row.get(base + 1)?,
        email: row.get(base + 2)?,
        name: row.get(base + 3)?,
        online: row.get(base + 4)?,
        last_seen: row.get(base + 5)?,
        created_at: row.get(base + 6)?,
    })
}

pub(crate) fn channel_at(row: &Row<'_>, base: usize) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        kind: row.get(base + 2)?,
        creator_id: row.get(base + 3)?,
        default_subchannel_id: row.get(base + 4)?,
        created_at: row.get(base + 5)?,
    })
}

pub(crate) fn membership_at(row: &Row<'_>, base: usize) -> rusqlite::Result<MembershipRow> {
    Ok(MembershipRow {
        id: row.get(base)?,
        user_id: row.get(base + 1)?,
        channel_id: row.get(base + 2)?,
        role: row.get(base + 3)?,
        last_read_at: row.get(base + 4)?,
        created_at: row.get(base + 5)?,
    })
}
