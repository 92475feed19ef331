use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

const V1: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id              TEXT PRIMARY KEY,
        wallet_address  TEXT NOT NULL UNIQUE,
        email           TEXT,
        name            TEXT NOT NULL,
        online          INTEGER NOT NULL DEFAULT 0,
        last_seen       TEXT NOT NULL,
        created_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS channels (
        id                      TEXT PRIMARY KEY,
        name                    TEXT NOT NULL,
        kind                    TEXT NOT NULL DEFAULT 'public',
        creator_id              TEXT NOT NULL REFERENCES users(id),
        default_subchannel_id   TEXT,
        created_at              TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS subchannels (
        id              TEXT PRIMARY KEY,
        name            TEXT NOT NULL,
        channel_id      TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
        is_token_gated  INTEGER NOT NULL DEFAULT 0,
        token_address   TEXT,
        is_default      INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL,
        UNIQUE(channel_id, name)
    );

    CREATE TABLE IF NOT EXISTS memberships (
        id              TEXT PRIMARY KEY,
        user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        channel_id      TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
        role            TEXT NOT NULL DEFAULT 'member',
        last_read_at    TEXT,
        created_at      TEXT NOT NULL,
        UNIQUE(user_id, channel_id)
    );

    CREATE INDEX IF NOT EXISTS idx_memberships_channel
        ON memberships(channel_id);

    CREATE TABLE IF NOT EXISTS messages (
        id              TEXT PRIMARY KEY,
        content         TEXT NOT NULL,
        user_id         TEXT NOT NULL REFERENCES users(id),
        subchannel_id   TEXT NOT NULL REFERENCES subchannels(id) ON DELETE CASCADE,
        read_by_users   TEXT NOT NULL DEFAULT '[]',
        created_at      TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_messages_subchannel
        ON messages(subchannel_id, created_at);

    CREATE TABLE IF NOT EXISTS invites (
        id              TEXT PRIMARY KEY,
        invite_code     TEXT NOT NULL UNIQUE,
        channel_id      TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
        created_by      TEXT NOT NULL REFERENCES users(id),
        expires_at      TEXT,
        max_uses        INTEGER,
        use_count       INTEGER NOT NULL DEFAULT 0,
        created_at      TEXT NOT NULL
    );
";

// Read markers by message rowid; millisecond timestamps cannot order a
// message against a mark-read in the same millisecond.
const V2: &str = "
    ALTER TABLE memberships ADD COLUMN last_read_seq INTEGER NOT NULL DEFAULT 0;

    UPDATE memberships
       SET last_read_seq = COALESCE(
           (SELECT MAX(m.rowid) FROM messages m
              JOIN subchannels s ON s.id = m.subchannel_id
             WHERE s.channel_id = memberships.channel_id
               AND m.created_at <= memberships.last_read_at),
           0)
     WHERE last_read_at IS NOT NULL;
";

pub fn run(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        let tx = conn.transaction()?;
        tx.execute_batch(V1)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    if version < 2 {
        info!("Running migration v2 (read markers by message sequence)");
        let tx = conn.transaction()?;
        tx.execute_batch(V2)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (2)", [])?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}
