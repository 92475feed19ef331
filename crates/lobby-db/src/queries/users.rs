use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use super::{USER_COLUMNS, user_at};
use crate::models::UserRow;
use crate::{Database, new_id, timestamp};

/// Fields for a first-time wallet login.
pub struct NewUser<'a> {
    pub wallet_address: &'a str,
    pub email: Option<&'a str>,
    pub name: &'a str,
}

impl Database {
    /// Returns the user owning `wallet_address`, creating it if needed, and
    /// marks it online. A single statement, so two concurrent first logins for
    /// the same wallet still produce one row.
    pub fn upsert_user_by_wallet(&self, new: &NewUser<'_>) -> Result<UserRow> {
        self.with_conn(|conn| {
            let now = timestamp();
            let user = conn.query_row(
                "INSERT INTO users (id, wallet_address, email, name, online, last_seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
                 ON CONFLICT(wallet_address) DO UPDATE SET online = 1, last_seen = excluded.last_seen
                 RETURNING id, wallet_address, email, name, online, last_seen, created_at",
                rusqlite::params![new_id(), new.wallet_address, new.email, new.name, now],
                |row| user_at(row, 0),
            )?;
            Ok(user)
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    /// Returns `None` when the user does not exist.
    pub fn set_presence(&self, id: &str, online: bool) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "UPDATE users SET online = ?1, last_seen = ?2 WHERE id = ?3
                     RETURNING id, wallet_address, email, name, online, last_seen, created_at",
                    rusqlite::params![online, timestamp(), id],
                    |row| user_at(row, 0),
                )
                .optional()?;
            Ok(user)
        })
    }
}

pub(crate) fn query_user(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
    let row = conn.query_row(&sql, [id], |row| user_at(row, 0)).optional()?;
    Ok(row)
}
