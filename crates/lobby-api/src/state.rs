use std::sync::Arc;

use tracing::error;

use lobby_db::Database;
use lobby_db::models::{ChannelRow, MembershipRow, UserRow};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self { db })
    }
}

/// Runs blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("database task failed: {}", e))
        })?
}

// -- Existence and membership checks shared by the handlers --

pub(crate) fn require_channel(db: &Database, channel_id: &str) -> Result<ChannelRow, ApiError> {
    db.get_channel(channel_id)?
        .ok_or_else(|| ApiError::not_found("Channel not found"))
}

pub(crate) fn require_user(db: &Database, user_id: &str) -> Result<UserRow, ApiError> {
    db.get_user(user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub(crate) fn require_membership(
    db: &Database,
    user_id: &str,
    channel_id: &str,
    denied: &str,
) -> Result<MembershipRow, ApiError> {
    db.get_membership(user_id, channel_id)?
        .ok_or_else(|| ApiError::forbidden(denied))
}
