//! Database row types. These map directly to SQLite rows and stay distinct
//! from the lobby-types API models.

pub struct UserRow {
    pub id: String,
    pub wallet_address: String,
    pub email: Option<String>,
    pub name: String,
    pub online: bool,
    pub last_seen: String,
    pub created_at: String,
}

pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub creator_id: String,
    pub default_subchannel_id: Option<String>,
    pub created_at: String,
}

pub struct SubChannelRow {
    pub id: String,
    pub name: String,
    pub channel_id: String,
    pub is_token_gated: bool,
    pub token_address: Option<String>,
    pub is_default: bool,
    pub created_at: String,
}

pub struct MembershipRow {
    pub id: String,
    pub user_id: String,
    pub channel_id: String,
    pub role: String,
    pub last_read_at: Option<String>,
    pub created_at: String,
}

/// A membership joined with its user.
pub struct MemberRow {
    pub membership: MembershipRow,
    pub user: UserRow,
}

/// A channel joined with the caller's membership and unread count.
pub struct ChannelSummaryRow {
    pub channel: ChannelRow,
    pub role: String,
    pub last_read_at: Option<String>,
    pub unread_count: u64,
}

/// A message joined with its author and the channel of its sub-channel.
pub struct MessageRow {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub subchannel_id: String,
    pub channel_id: String,
    pub read_by_users: Vec<String>,
    pub created_at: String,
    pub user: UserRow,
}

pub struct InviteRow {
    pub id: String,
    pub invite_code: String,
    pub channel_id: String,
    pub created_by: String,
    pub expires_at: Option<String>,
    pub max_uses: Option<u32>,
    pub use_count: u32,
    pub created_at: String,
}
