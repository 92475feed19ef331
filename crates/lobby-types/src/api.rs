use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChannelKind, Role};

// -- Errors --

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Users --

/// Wallet login. Every field is optional on the wire so a missing wallet
/// address can be reported as a 400 rather than a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUserRequest {
    pub wallet_address: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePresenceRequest {
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub wallet_address: String,
    pub email: Option<String>,
    pub name: String,
    pub online: bool,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ChannelKind,
    pub creator_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub creator_id: String,
    pub default_subchannel_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDetailResponse {
    #[serde(flatten)]
    pub channel: ChannelResponse,
    pub subchannels: Vec<SubChannelResponse>,
    pub member_count: u64,
}

/// A channel as seen from one member's seat.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummaryResponse {
    #[serde(flatten)]
    pub channel: ChannelResponse,
    pub role: Role,
    pub last_read_at: Option<DateTime<Utc>>,
    pub unread_count: u64,
}

// -- Sub-channels --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateSubChannelRequest {
    pub name: String,
    pub user_id: String,
    #[serde(default)]
    pub is_token_gated: bool,
    pub token_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubChannelResponse {
    pub id: String,
    pub name: String,
    pub channel_id: String,
    pub is_token_gated: bool,
    pub token_address: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

// -- Memberships --

/// Body shared by join, mark-read, read-receipt and invite redemption.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserIdRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub id: String,
    pub user_id: String,
    pub channel_id: String,
    pub role: Role,
    pub last_read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

// -- Messages --

/// Lenient: clients may send extra fields such as `channelId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub user_id: Option<String>,
    pub subchannel_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub channel_id: String,
    pub subchannel_id: String,
    pub created_at: DateTime<Utc>,
    pub read_by_users: Vec<String>,
    pub user: UserResponse,
}

// -- Invites --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateInviteRequest {
    pub user_id: String,
    pub expires_in_hours: Option<u32>,
    pub max_uses: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub id: String,
    pub invite_code: String,
    pub channel_id: String,
    pub created_by: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<u32>,
    pub use_count: u32,
    pub created_at: DateTime<Utc>,
}
