//! Row → wire conversions. Stored values that fail to parse are logged and
//! replaced with defaults rather than failing the whole response.

use chrono::{DateTime, Utc};
use tracing::warn;

use lobby_db::models::{
    ChannelRow, ChannelSummaryRow, InviteRow, MemberRow, MembershipRow, MessageRow, SubChannelRow, UserRow,
};
use lobby_types::api::{
    ChannelResponse, ChannelSummaryResponse, InviteResponse, MembershipResponse, MessageResponse,
    SubChannelResponse, UserResponse,
};
use lobby_types::models::{ChannelKind, Role};

fn timestamp(raw: &str, field: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on '{}': {}", field, raw, owner, e);
        DateTime::default()
    })
}

fn role(raw: &str, owner: &str) -> Role {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt role on membership '{}': {}", owner, e);
        Role::Member
    })
}

pub(crate) fn parse_kind(row: &ChannelRow) -> ChannelKind {
    row.kind.parse().unwrap_or_else(|e| {
        warn!("Corrupt kind on channel '{}': {}", row.id, e);
        ChannelKind::Public
    })
}

pub(crate) fn parse_role(row: &MembershipRow) -> Role {
    role(&row.role, &row.id)
}

pub(crate) fn user(row: UserRow) -> UserResponse {
    UserResponse {
        last_seen: timestamp(&row.last_seen, "last_seen", &row.id),
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        id: row.id,
        wallet_address: row.wallet_address,
        email: row.email,
        name: row.name,
        online: row.online,
    }
}

pub(crate) fn channel(row: ChannelRow) -> ChannelResponse {
    ChannelResponse {
        kind: parse_kind(&row),
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        id: row.id,
        name: row.name,
        creator_id: row.creator_id,
        default_subchannel_id: row.default_subchannel_id,
    }
}

pub(crate) fn channel_summary(row: ChannelSummaryRow) -> ChannelSummaryResponse {
    ChannelSummaryResponse {
        role: role(&row.role, &row.channel.id),
        last_read_at: row
            .last_read_at
            .as_deref()
            .map(|at| timestamp(at, "last_read_at", &row.channel.id)),
        unread_count: row.unread_count,
        channel: channel(row.channel),
    }
}

pub(crate) fn subchannel(row: SubChannelRow) -> SubChannelResponse {
    SubChannelResponse {
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        id: row.id,
        name: row.name,
        channel_id: row.channel_id,
        is_token_gated: row.is_token_gated,
        token_address: row.token_address,
        is_default: row.is_default,
    }
}

pub(crate) fn membership(row: MembershipRow, user: Option<UserRow>) -> MembershipResponse {
    MembershipResponse {
        role: parse_role(&row),
        last_read_at: row
            .last_read_at
            .as_deref()
            .map(|at| timestamp(at, "last_read_at", &row.id)),
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        id: row.id,
        user_id: row.user_id,
        channel_id: row.channel_id,
        user: user.map(self::user),
    }
}

pub(crate) fn member(row: MemberRow) -> MembershipResponse {
    membership(row.membership, Some(row.user))
}

pub(crate) fn message(row: MessageRow) -> MessageResponse {
    MessageResponse {
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        id: row.id,
        content: row.content,
        user_id: row.user_id,
        channel_id: row.channel_id,
        subchannel_id: row.subchannel_id,
        read_by_users: row.read_by_users,
        user: user(row.user),
    }
}

pub(crate) fn invite(row: InviteRow) -> InviteResponse {
    InviteResponse {
        expires_at: row
            .expires_at
            .as_deref()
            .map(|at| timestamp(at, "expires_at", &row.id)),
        created_at: timestamp(&row.created_at, "created_at", &row.id),
        id: row.id,
        invite_code: row.invite_code,
        channel_id: row.channel_id,
        created_by: row.created_by,
        max_uses: row.max_uses,
        use_count: row.use_count,
    }
}
