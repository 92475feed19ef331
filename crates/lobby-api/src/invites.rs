use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{Duration, SecondsFormat, Utc};

use lobby_db::RedeemOutcome;
use lobby_types::api::{CreateInviteRequest, InviteResponse, UserIdRequest};

use crate::convert;
use crate::error::{ApiError, ApiJson};
use crate::state::{AppState, blocking, require_channel, require_membership, require_user};

/// Longest invite lifetime: ten years.
pub const MAX_INVITE_HOURS: u32 = 24 * 365 * 10;

/// POST /channels/{id}/invites — any member may invite.
pub async fn create_invite(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    WithRejection(Json(req), _): ApiJson<CreateInviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.max_uses == Some(0) {
        return Err(ApiError::bad_request("maxUses must be at least 1"));
    }
    let expires_at = match req.expires_in_hours {
        Some(0) => return Err(ApiError::bad_request("expiresInHours must be at least 1")),
        Some(hours) if hours > MAX_INVITE_HOURS => {
            return Err(ApiError::bad_request(format!(
                "expiresInHours must be at most {}",
                MAX_INVITE_HOURS
            )));
        }
        Some(hours) => {
            let at = Utc::now()
                .checked_add_signed(Duration::hours(i64::from(hours)))
                .ok_or_else(|| ApiError::bad_request("expiresInHours is out of range"))?;
            Some(at.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        None => None,
    };

    let row = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        require_membership(db, &req.user_id, &channel.id, "You must be a member to create invites")?;
        Ok(db.create_invite(&channel.id, &req.user_id, expires_at.as_deref(), req.max_uses)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::invite(row))))
}

pub async fn list_invites(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<InviteResponse>>, ApiError> {
    let rows = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        Ok(db.list_invites(&channel.id)?)
    })
    .await?;
    Ok(Json(rows.into_iter().map(convert::invite).collect()))
}

/// POST /invites/{code}/redeem
pub async fn redeem_invite(
    State(state): State<AppState>,
    Path(code): Path<String>,
    WithRejection(Json(req), _): ApiJson<UserIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (membership, created) = blocking(&state, move |db| {
        let user = require_user(db, &req.user_id)?;
        match db.redeem_invite(&code, &user.id)? {
            RedeemOutcome::NotFound => Err(ApiError::not_found("Invite not found")),
            RedeemOutcome::Expired => Err(ApiError::Gone("Invite has expired".into())),
            RedeemOutcome::Exhausted => Err(ApiError::Gone("Invite has reached its maximum uses".into())),
            RedeemOutcome::AlreadyMember(m) => Ok((convert::membership(m, Some(user)), false)),
            RedeemOutcome::Joined(m) => Ok((convert::membership(m, Some(user)), true)),
        }
    })
    .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(membership)))
}
