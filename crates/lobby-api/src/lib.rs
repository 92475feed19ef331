pub mod channels;
pub mod error;
pub mod invites;
pub mod members;
pub mod messages;
pub mod state;
pub mod users;

mod convert;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All demo chat routes under `/api/demo`, plus `/api/health`.
pub fn router(state: AppState) -> Router {
    let demo = Router::new()
        .route("/users/me", post(users::upsert_me))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/presence", post(users::update_presence))
        .route("/users/{user_id}/channels", get(users::list_user_channels))
        .route("/channels", post(channels::create_channel))
        .route("/channels/{channel_id}", get(channels::get_channel))
        .route(
            "/channels/{channel_id}/subchannels",
            get(channels::list_subchannels).post(channels::create_subchannel),
        )
        .route(
            "/channels/{channel_id}/members",
            get(members::list_members).post(members::join_channel),
        )
        .route("/channels/{channel_id}/members/{user_id}", delete(members::leave_channel))
        .route("/channels/{channel_id}/read", post(members::mark_read))
        .route(
            "/channels/{channel_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/channels/{channel_id}/messages/{message_id}/read",
            post(messages::mark_message_read),
        )
        .route(
            "/channels/{channel_id}/invites",
            get(invites::list_invites).post(invites::create_invite),
        )
        .route("/invites/{code}/redeem", post(invites::redeem_invite));

    Router::new()
        .nest("/api/demo", demo)
        .route("/api/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
