use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use lobby_api::{AppStateInner, router};
use lobby_db::Database;

fn app() -> Router {
    router(AppStateInner::new(Database::open_in_memory().unwrap()))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, wallet: &str) -> String {
    let (status, user) = call(app, Method::POST, "/api/demo/users/me", Some(json!({ "walletAddress": wallet }))).await;
    assert_eq!(status, StatusCode::OK);
    user["id"].as_str().unwrap().to_string()
}

async fn create_channel(app: &Router, creator: &str, kind: &str) -> Value {
    let (status, channel) = call(
        app,
        Method::POST,
        "/api/demo/channels",
        Some(json!({ "name": "lounge", "type": kind, "creatorId": creator })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    channel
}

async fn message_count(app: &Router, channel_id: &str) -> usize {
    let (_, messages) = call(app, Method::GET, &format!("/api/demo/channels/{channel_id}/messages"), None).await;
    messages.as_array().unwrap().len()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

// -- Users --

#[tokio::test]
async fn wallet_login_is_idempotent() {
    let app = app();
    let body = json!({ "walletAddress": "0xfeedface01", "email": "ada@example.com" });

    let (status, first) = call(&app, Method::POST, "/api/demo/users/me", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["name"], "ada");
    assert_eq!(first["online"], true);

    let (_, second) = call(&app, Method::POST, "/api/demo/users/me", Some(body)).await;
    assert_eq!(first["id"], second["id"]);
}

#[tokio::test]
async fn wallet_login_requires_address() {
    let app = app();
    let (status, body) = call(&app, Method::POST, "/api/demo/users/me", Some(json!({ "name": "anon" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Wallet address is required");

    let (status, _) = call(&app, Method::POST, "/api/demo/users/me", Some(json!({ "walletAddress": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_a_json_bad_request() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/demo/users/me")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn presence_and_lookup() {
    let app = app();
    let user = login(&app, "0xpresence").await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/demo/users/{user}/presence"),
        Some(json!({ "online": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], false);

    let (status, body) = call(&app, Method::GET, &format!("/api/demo/users/{user}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["walletAddress"], "0xpresence");

    let (status, body) = call(&app, Method::GET, "/api/demo/users/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

// -- Messages --

#[tokio::test]
async fn unknown_channel_is_not_found_for_both_message_routes() {
    let app = app();
    let user = login(&app, "0xlost").await;

    let (status, body) = call(&app, Method::GET, "/api/demo/channels/c-missing/messages", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Channel not found");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/demo/channels/c-missing/messages",
        Some(json!({ "content": "hi", "userId": user })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Channel not found");
}

#[tokio::test]
async fn non_member_cannot_post() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let outsider = login(&app, "0xoutsider").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/demo/channels/{channel_id}/messages"),
        Some(json!({ "content": "let me in", "userId": outsider })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You must be a member to send messages");
    assert_eq!(message_count(&app, channel_id).await, 0);
}

#[tokio::test]
async fn member_posts_and_lists_in_order() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();
    let uri = format!("/api/demo/channels/{channel_id}/messages");

    let (status, first) = call(&app, Method::POST, &uri, Some(json!({ "content": "hi", "userId": owner }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["content"], "hi");
    assert_eq!(first["userId"], owner.as_str());
    assert_eq!(first["channelId"], channel_id);
    assert_eq!(first["subchannelId"], channel["defaultSubchannelId"]);
    assert_eq!(first["user"]["id"], owner.as_str());

    let (status, _) = call(&app, Method::POST, &uri, Some(json!({ "content": "there", "userId": owner }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["hi", "there"]);
}

#[tokio::test]
async fn blank_content_is_rejected() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/demo/channels/{channel_id}/messages"),
        Some(json!({ "content": "   ", "userId": owner })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message content is required");
    assert_eq!(message_count(&app, channel_id).await, 0);
}

#[tokio::test]
async fn missing_or_blank_sender_is_rejected() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();
    let uri = format!("/api/demo/channels/{channel_id}/messages");

    for body in [json!({ "content": "hi" }), json!({ "content": "hi", "userId": "  " })] {
        let (status, body) = call(&app, Method::POST, &uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User id is required");
    }
    assert_eq!(message_count(&app, channel_id).await, 0);
}

#[tokio::test]
async fn content_is_capped_at_4000_chars() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();
    let uri = format!("/api/demo/channels/{channel_id}/messages");

    let (status, body) = call(&app, Method::POST, &uri, Some(json!({ "content": "é".repeat(4001), "userId": owner }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message content exceeds 4000 characters");
    assert_eq!(message_count(&app, channel_id).await, 0);

    // Counted in characters, not bytes.
    let (status, _) = call(&app, Method::POST, &uri, Some(json!({ "content": "é".repeat(4000), "userId": owner }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message_count(&app, channel_id).await, 1);
}

#[tokio::test]
async fn extra_fields_in_send_body_are_ignored() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (status, message) = call(
        &app,
        Method::POST,
        &format!("/api/demo/channels/{channel_id}/messages"),
        Some(json!({ "content": "hi", "userId": owner, "channelId": channel_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["content"], "hi");
}

#[tokio::test]
async fn messages_target_a_named_subchannel() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (status, side) = call(
        &app,
        Method::POST,
        &format!("/api/demo/channels/{channel_id}/subchannels"),
        Some(json!({ "name": "side", "userId": owner })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let side_id = side["id"].as_str().unwrap();

    let uri = format!("/api/demo/channels/{channel_id}/messages");
    call(&app, Method::POST, &uri, Some(json!({ "content": "main", "userId": owner }))).await;
    let (status, posted) = call(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "content": "aside", "userId": owner, "subchannelId": side_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posted["subchannelId"], side_id);

    let (_, filtered) = call(&app, Method::GET, &format!("{uri}?subchannelId={side_id}"), None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["content"], "aside");

    let (status, body) = call(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "content": "lost", "userId": owner, "subchannelId": "elsewhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Sub-channel not found");
}

#[tokio::test]
async fn read_receipts_need_membership() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let outsider = login(&app, "0xoutsider").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (_, message) = call(
        &app,
        Method::POST,
        &format!("/api/demo/channels/{channel_id}/messages"),
        Some(json!({ "content": "read me", "userId": owner })),
    )
    .await;
    let read_uri = format!("/api/demo/channels/{channel_id}/messages/{}/read", message["id"].as_str().unwrap());

    let (status, _) = call(&app, Method::POST, &read_uri, Some(json!({ "userId": outsider }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    call(&app, Method::POST, &read_uri, Some(json!({ "userId": owner }))).await;
    let (status, body) = call(&app, Method::POST, &read_uri, Some(json!({ "userId": owner }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["readByUsers"], json!([owner]));
}

// -- Channels and memberships --

#[tokio::test]
async fn channel_detail_lists_default_subchannel() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let channel = create_channel(&app, &owner, "public").await;

    assert_eq!(channel["type"], "public");
    assert_eq!(channel["memberCount"], 1);
    assert_eq!(channel["subchannels"][0]["name"], "general");
    assert_eq!(channel["subchannels"][0]["isDefault"], true);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/demo/channels",
        Some(json!({ "name": "orphan", "creatorId": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn only_admins_create_subchannels() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let guest = login(&app, "0xguest").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();
    let uri = format!("/api/demo/channels/{channel_id}/subchannels");

    call(&app, Method::POST, &format!("/api/demo/channels/{channel_id}/members"), Some(json!({ "userId": guest }))).await;
    let (status, _) = call(&app, Method::POST, &uri, Some(json!({ "name": "mine", "userId": guest }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "name": "holders", "userId": owner, "isTokenGated": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Token-gated sub-channels need a token address");

    let (status, _) = call(&app, Method::POST, &uri, Some(json!({ "name": "general", "userId": owner }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn joining_public_and_private_channels() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let guest = login(&app, "0xguest").await;
    let open = create_channel(&app, &owner, "public").await;
    let closed = create_channel(&app, &owner, "private").await;

    let join = |id: &str| format!("/api/demo/channels/{id}/members");
    let (status, membership) = call(&app, Method::POST, &join(open["id"].as_str().unwrap()), Some(json!({ "userId": guest }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(membership["role"], "member");
    assert_eq!(membership["user"]["id"], guest.as_str());

    let (status, _) = call(&app, Method::POST, &join(open["id"].as_str().unwrap()), Some(json!({ "userId": guest }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::POST, &join(closed["id"].as_str().unwrap()), Some(json!({ "userId": guest }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "This channel is invite-only");

    let (_, members) = call(&app, Method::GET, &join(open["id"].as_str().unwrap()), None).await;
    assert_eq!(members.as_array().unwrap().len(), 2);
    assert_eq!(members[0]["role"], "owner");

    let (_, channels) = call(&app, Method::GET, &format!("/api/demo/users/{guest}/channels"), None).await;
    assert_eq!(channels.as_array().unwrap().len(), 1);
    assert_eq!(channels[0]["id"], open["id"]);
}

#[tokio::test]
async fn leaving_removes_posting_rights() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let guest = login(&app, "0xguest").await;
    let channel = create_channel(&app, &owner, "public").await;
    let channel_id = channel["id"].as_str().unwrap();

    call(&app, Method::POST, &format!("/api/demo/channels/{channel_id}/members"), Some(json!({ "userId": guest }))).await;
    let leave = format!("/api/demo/channels/{channel_id}/members/{guest}");
    let (status, _) = call(&app, Method::DELETE, &leave, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, &leave, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/demo/channels/{channel_id}/messages"),
        Some(json!({ "content": "still here?", "userId": guest })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn mark_read_sets_marker_for_members_only() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let outsider = login(&app, "0xoutsider").await;
    let channel = create_channel(&app, &owner, "public").await;
    let uri = format!("/api/demo/channels/{}/read", channel["id"].as_str().unwrap());

    let (status, body) = call(&app, Method::POST, &uri, Some(json!({ "userId": owner }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["lastReadAt"].is_string());

    let (status, _) = call(&app, Method::POST, &uri, Some(json!({ "userId": outsider }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Invites --

#[tokio::test]
async fn invite_admits_to_private_channel_until_used_up() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let first = login(&app, "0xfirst").await;
    let second = login(&app, "0xsecond").await;
    let channel = create_channel(&app, &owner, "private").await;
    let channel_id = channel["id"].as_str().unwrap();

    let (status, invite) = call(
        &app,
        Method::POST,
        &format!("/api/demo/channels/{channel_id}/invites"),
        Some(json!({ "userId": owner, "maxUses": 1, "expiresInHours": 24 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invite["useCount"], 0);
    assert!(invite["expiresAt"].is_string());
    let redeem = format!("/api/demo/invites/{}/redeem", invite["inviteCode"].as_str().unwrap());

    let (status, membership) = call(&app, Method::POST, &redeem, Some(json!({ "userId": first }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(membership["channelId"], channel_id);

    let (status, _) = call(&app, Method::POST, &redeem, Some(json!({ "userId": first }))).await;
    assert_eq!(status, StatusCode::GONE);

    let (status, body) = call(&app, Method::POST, &redeem, Some(json!({ "userId": second }))).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "Invite has reached its maximum uses");

    let (_, invites) = call(&app, Method::GET, &format!("/api/demo/channels/{channel_id}/invites"), None).await;
    assert_eq!(invites[0]["useCount"], 1);
}

#[tokio::test]
async fn invite_rules() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let outsider = login(&app, "0xoutsider").await;
    let channel = create_channel(&app, &owner, "private").await;
    let uri = format!("/api/demo/channels/{}/invites", channel["id"].as_str().unwrap());

    let (status, _) = call(&app, Method::POST, &uri, Some(json!({ "userId": outsider }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::POST, &uri, Some(json!({ "userId": owner, "maxUses": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::POST, "/api/demo/invites/nope/redeem", Some(json!({ "userId": outsider }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invite not found");
}

#[tokio::test]
async fn invite_lifetime_is_bounded() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let channel = create_channel(&app, &owner, "private").await;
    let uri = format!("/api/demo/channels/{}/invites", channel["id"].as_str().unwrap());

    for hours in [u32::MAX, lobby_api::invites::MAX_INVITE_HOURS + 1] {
        let (status, body) = call(&app, Method::POST, &uri, Some(json!({ "userId": owner, "expiresInHours": hours }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("expiresInHours"));
    }
    let (_, invites) = call(&app, Method::GET, &uri, None).await;
    assert!(invites.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn longest_lived_invite_can_be_redeemed() {
    let app = app();
    let owner = login(&app, "0xowner").await;
    let guest = login(&app, "0xguest").await;
    let channel = create_channel(&app, &owner, "private").await;
    let uri = format!("/api/demo/channels/{}/invites", channel["id"].as_str().unwrap());

    let (status, invite) = call(
        &app,
        Method::POST,
        &uri,
        Some(json!({ "userId": owner, "expiresInHours": lobby_api::invites::MAX_INVITE_HOURS })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let code = invite["inviteCode"].as_str().unwrap();
    let (status, membership) = call(
        &app,
        Method::POST,
        &format!("/api/demo/invites/{code}/redeem"),
        Some(json!({ "userId": guest })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(membership["role"], "member");
}
