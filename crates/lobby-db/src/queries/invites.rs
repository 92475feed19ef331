use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use rand::distr::{Alphanumeric, SampleString};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{info, warn};

use lobby_types::models::Role;

use super::memberships::{insert_membership, query_membership};
use crate::models::{InviteRow, MembershipRow};
use crate::{Database, new_id, timestamp};

const INVITE_CODE_LEN: usize = 10;
const CODE_ATTEMPTS: usize = 5;

const INVITE_COLUMNS: &str =
    "id, invite_code, channel_id, created_by, expires_at, max_uses, use_count, created_at";

/// Result of redeeming an invite code.
pub enum RedeemOutcome {
    NotFound,
    Expired,
    Exhausted,
    /// Already a member; no use was consumed.
    AlreadyMember(MembershipRow),
    Joined(MembershipRow),
}

impl Database {
    /// Creates an invite with a fresh random code. `expires_at` uses the
    /// stored timestamp format.
    pub fn create_invite(
        &self,
        channel_id: &str,
        created_by: &str,
        expires_at: Option<&str>,
        max_uses: Option<u32>,
    ) -> Result<InviteRow> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO invites (id, invite_code, channel_id, created_by, expires_at, max_uses, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(invite_code) DO NOTHING
                 RETURNING {INVITE_COLUMNS}"
            );

            for _ in 0..CODE_ATTEMPTS {
                let code = Alphanumeric.sample_string(&mut rand::rng(), INVITE_CODE_LEN);
                let invite = conn
                    .query_row(
                        &sql,
                        rusqlite::params![new_id(), code, channel_id, created_by, expires_at, max_uses, timestamp()],
                        invite_from_row,
                    )
                    .optional()?;
                if let Some(invite) = invite {
                    return Ok(invite);
                }
            }
            bail!("Could not generate a unique invite code after {} attempts", CODE_ATTEMPTS)
        })
    }

    pub fn list_invites(&self, channel_id: &str) -> Result<Vec<InviteRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {INVITE_COLUMNS} FROM invites WHERE channel_id = ?1 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([channel_id], invite_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Checks expiry and use limit, then adds `user_id` to the invite's
    /// channel and consumes one use, all in one transaction.
    pub fn redeem_invite(&self, code: &str, user_id: &str) -> Result<RedeemOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(invite) = query_invite_by_code(&tx, code)? else {
                return Ok(RedeemOutcome::NotFound);
            };
            if invite.expires_at.as_deref().is_some_and(|at| has_expired(at, Utc::now())) {
                return Ok(RedeemOutcome::Expired);
            }
            if invite.max_uses.is_some_and(|max| invite.use_count >= max) {
                return Ok(RedeemOutcome::Exhausted);
            }
            if let Some(existing) = query_membership(&tx, user_id, &invite.channel_id)? {
                return Ok(RedeemOutcome::AlreadyMember(existing));
            }

            let (membership, _) = insert_membership(&tx, user_id, &invite.channel_id, Role::Member)?;
            tx.execute(
                "UPDATE invites SET use_count = use_count + 1 WHERE id = ?1",
                [&invite.id],
            )?;
            tx.commit()?;

            info!("User {} joined channel {} with invite {}", user_id, invite.channel_id, code);
            Ok(RedeemOutcome::Joined(membership))
        })
    }
}

/// Compares as instants, not strings: years past 9999 carry a sign prefix
/// and would sort before every four-digit year. Unreadable values count as
/// expired.
fn has_expired(expires_at: &str, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(at) => at <= now,
        Err(e) => {
            warn!("Invalid invite expiry '{}': {}", expires_at, e);
            true
        }
    }
}

fn query_invite_by_code(conn: &Connection, code: &str) -> Result<Option<InviteRow>> {
    let sql = format!("SELECT {INVITE_COLUMNS} FROM invites WHERE invite_code = ?1");
    let row = conn.query_row(&sql, [code], invite_from_row).optional()?;
    Ok(row)
}

fn invite_from_row(row: &Row<'_>) -> rusqlite::Result<InviteRow> {
    Ok(InviteRow {
        id: row.get(0)?,
        invite_code: row.get(1)?,
        channel_id: row.get(2)?,
        created_by: row.get(3)?,
        expires_at: row.get(4)?,
        max_uses: row.get(5)?,
        use_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}
