use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::debug;

use lobby_db::Database;
use lobby_db::models::ChannelRow;
use lobby_types::api::{MessageResponse, SendMessageRequest, UserIdRequest};

use crate::convert;
use crate::error::{ApiError, ApiJson};
use crate::state::{AppState, blocking, require_channel, require_membership};

const MAX_CONTENT_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    /// Narrow the listing to one sub-channel.
    pub subchannel_id: Option<String>,
}

/// POST /channels/{id}/messages
///
/// The channel must exist and the sender must hold a membership in it. The
/// message lands in `subchannelId` when given, otherwise in the channel's
/// default sub-channel.
pub async fn send_message(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    WithRejection(Json(req), _): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = req
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("User id is required"))?;
    let content = req
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Message content is required"))?;
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::bad_request(format!(
            "Message content exceeds {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    let target = req.subchannel_id;

    let row = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        require_membership(db, &user_id, &channel.id, "You must be a member to send messages")?;

        let subchannel_id = match target {
            Some(id) => require_subchannel(db, &channel, &id)?,
            None => channel.default_subchannel_id.clone().ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!("Channel {} has no default sub-channel", channel.id))
            })?,
        };

        Ok(db.insert_message(&subchannel_id, &user_id, &content)?)
    })
    .await?;

    debug!("Message {} posted to sub-channel {}", row.id, row.subchannel_id);
    Ok((StatusCode::CREATED, Json(convert::message(row))))
}

/// GET /channels/{id}/messages — oldest first, unpaginated.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let rows = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        if let Some(id) = &query.subchannel_id {
            require_subchannel(db, &channel, id)?;
        }
        Ok(db.list_channel_messages(&channel.id, query.subchannel_id.as_deref())?)
    })
    .await?;

    Ok(Json(rows.into_iter().map(convert::message).collect()))
}

/// POST /channels/{id}/messages/{message_id}/read — add a read receipt.
pub async fn mark_message_read(
    State(state): State<AppState>,
    Path((channel_id, message_id)): Path<(String, String)>,
    WithRejection(Json(req), _): ApiJson<UserIdRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let row = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        require_membership(db, &req.user_id, &channel.id, "You must be a member to read messages")?;

        let in_channel = db
            .get_message(&message_id)?
            .is_some_and(|m| m.channel_id == channel.id);
        if !in_channel {
            return Err(ApiError::not_found("Message not found"));
        }
        db.mark_message_read(&message_id, &req.user_id)?
            .ok_or_else(|| ApiError::not_found("Message not found"))
    })
    .await?;

    Ok(Json(convert::message(row)))
}

/// Returns the id of a sub-channel that belongs to `channel`.
fn require_subchannel(db: &Database, channel: &ChannelRow, subchannel_id: &str) -> Result<String, ApiError> {
    db.get_subchannel(subchannel_id)?
        .filter(|s| s.channel_id == channel.id)
        .map(|s| s.id)
        .ok_or_else(|| ApiError::not_found("Sub-channel not found"))
}
