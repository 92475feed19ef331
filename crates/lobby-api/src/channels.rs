use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use lobby_db::Database;
use lobby_db::models::ChannelRow;
use lobby_types::api::{
    ChannelDetailResponse, CreateChannelRequest, CreateSubChannelRequest, SubChannelResponse,
};

use crate::convert;
use crate::error::{ApiError, ApiJson};
use crate::state::{AppState, blocking, require_channel, require_user};

/// POST /channels — creates the channel with its default sub-channel and
/// makes the creator its owner.
pub async fn create_channel(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<CreateChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Channel name is required"));
    }

    let detail = blocking(&state, move |db| {
        require_user(db, &req.creator_id)?;
        let channel = db.create_channel(&name, req.kind, &req.creator_id)?;
        channel_detail(db, channel)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<ChannelDetailResponse>, ApiError> {
    let detail = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        channel_detail(db, channel)
    })
    .await?;
    Ok(Json(detail))
}

/// POST /channels/{id}/subchannels — owners and admins only.
pub async fn create_subchannel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    WithRejection(Json(req), _): ApiJson<CreateSubChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Sub-channel name is required"));
    }
    let token_address = req
        .token_address
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if req.is_token_gated && token_address.is_none() {
        return Err(ApiError::bad_request("Token-gated sub-channels need a token address"));
    }
    // An address without gating has no meaning.
    let token_address = token_address.filter(|_| req.is_token_gated);

    let row = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        let can_manage = db
            .get_membership(&req.user_id, &channel.id)?
            .is_some_and(|m| convert::parse_role(&m).can_manage());
        if !can_manage {
            return Err(ApiError::forbidden(
                "Only channel owners and admins can create sub-channels",
            ));
        }
        if db.subchannel_name_taken(&channel.id, &name)? {
            return Err(ApiError::bad_request("A sub-channel with that name already exists"));
        }
        Ok(db.create_subchannel(&channel.id, &name, req.is_token_gated, token_address.as_deref())?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::subchannel(row))))
}

pub async fn list_subchannels(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<SubChannelResponse>>, ApiError> {
    let rows = blocking(&state, move |db| {
        let channel = require_channel(db, &channel_id)?;
        Ok(db.list_subchannels(&channel.id)?)
    })
    .await?;
    Ok(Json(rows.into_iter().map(convert::subchannel).collect()))
}

fn channel_detail(db: &Database, channel: ChannelRow) -> Result<ChannelDetailResponse, ApiError> {
    let subchannels = db.list_subchannels(&channel.id)?;
    let member_count = db.count_members(&channel.id)?;
    Ok(ChannelDetailResponse {
        channel: convert::channel(channel),
        subchannels: subchannels.into_iter().map(convert::subchannel).collect(),
        member_count,
    })
}
