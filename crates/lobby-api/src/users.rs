use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use lobby_db::NewUser;
use lobby_types::api::{ChannelSummaryResponse, UpdatePresenceRequest, UpsertUserRequest, UserResponse};

use crate::convert;
use crate::error::{ApiError, ApiJson};
use crate::state::{AppState, blocking, require_user};

/// Length of the wallet prefix used as a fallback display name.
const WALLET_NAME_CHARS: usize = 8;

/// POST /users/me — look up the wallet's user, creating it on first login.
pub async fn upsert_me(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<UpsertUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let wallet = req
        .wallet_address
        .as_deref()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .ok_or_else(|| ApiError::bad_request("Wallet address is required"))?
        .to_string();
    let email = non_blank(req.email.as_deref()).map(str::to_string);
    let name = display_name(&wallet, email.as_deref(), req.name.as_deref());

    let user = blocking(&state, move |db| {
        Ok(db.upsert_user_by_wallet(&NewUser {
            wallet_address: &wallet,
            email: email.as_deref(),
            name: &name,
        })?)
    })
    .await?;

    debug!("Wallet login for user {}", user.id);
    Ok(Json(convert::user(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = blocking(&state, move |db| require_user(db, &user_id)).await?;
    Ok(Json(convert::user(user)))
}

/// POST /users/{id}/presence
pub async fn update_presence(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    WithRejection(Json(req), _): ApiJson<UpdatePresenceRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = blocking(&state, move |db| {
        db.set_presence(&user_id, req.online)?
            .ok_or_else(|| ApiError::not_found("User not found"))
    })
    .await?;
    Ok(Json(convert::user(user)))
}

/// GET /users/{id}/channels — the user's channels with unread counts.
pub async fn list_user_channels(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ChannelSummaryResponse>>, ApiError> {
    let rows = blocking(&state, move |db| {
        require_user(db, &user_id)?;
        Ok(db.list_channels_for_user(&user_id)?)
    })
    .await?;
    Ok(Json(rows.into_iter().map(convert::channel_summary).collect()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Explicit name, else the email's local part, else a wallet prefix.
fn display_name(wallet: &str, email: Option<&str>, name: Option<&str>) -> String {
    if let Some(name) = non_blank(name) {
        return name.to_string();
    }
    if let Some(local) = email
        .and_then(|e| e.split('@').next())
        .filter(|local| !local.is_empty())
    {
        return local.to_string();
    }
    wallet.chars().take(WALLET_NAME_CHARS).collect()
}
