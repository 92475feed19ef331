use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use lobby_types::api::{MembershipResponse, UserIdRequest};
use lobby_types::models::{ChannelKind, Role};

use crate::convert;
use crate::error::{ApiError, ApiJson};
use crate::state::{AppState, blocking, require_channel, require_membership, require_user};

/// POST /channels/{id}/members — join a public channel.
/// 201 for a new membership, 200 if the user was already a member.
pub async fn join_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    WithRejection(Json(req), _): ApiJson<UserIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (response, created) = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        let user = require_user(db, &req.user_id)?;

        if let Some(existing) = db.get_membership(&user.id, &channel.id)? {
            return Ok((convert::membership(existing, Some(user)), false));
        }
        if convert::parse_kind(&channel) == ChannelKind::Private {
            return Err(ApiError::forbidden("This channel is invite-only"));
        }

        let (membership, created) = db.add_membership(&user.id, &channel.id, Role::Member)?;
        if created {
            info!("User {} joined channel {}", user.id, channel.id);
        }
        Ok((convert::membership(membership, Some(user)), created))
    })
    .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(response)))
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<MembershipResponse>>, ApiError> {
    let rows = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        Ok(db.list_members(&channel.id)?)
    })
    .await?;
    Ok(Json(rows.into_iter().map(convert::member).collect()))
}

/// DELETE /channels/{id}/members/{user_id}
pub async fn leave_channel(
    State(state): State<AppState>,
    Path((channel_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        if !db.remove_membership(&user_id, &channel.id)? {
            return Err(ApiError::not_found("Membership not found"));
        }
        info!("User {} left channel {}", user_id, channel.id);
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /channels/{id}/read — move the caller's read marker to now.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    WithRejection(Json(req), _): ApiJson<UserIdRequest>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let membership = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        require_membership(db, &req.user_id, &channel.id, "You must be a member to read messages")?;
        db.mark_read(&req.user_id, &channel.id)?
            .ok_or_else(|| ApiError::forbidden("You must be a member to read messages"))
    })
    .await?;
    Ok(Json(convert::membership(membership, None)))
}
