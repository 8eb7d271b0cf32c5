//! Identity API HTTP Handler Tests

use super::{build_test_router, delete, get, post, put, TestAppState};
use axum::http::StatusCode;
use oauth2_admin::domain::{verify_password, User};
use pretty_assertions::assert_eq;
use serde_json::json;

async fn setup() -> (TestAppState, User, String) {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let member = state.add_user(mine.id, "member").await;
    (state, member, token)
}

#[tokio::test]
async fn test_create_password_identity_hashes_password() {
    let (state, member, token) = setup().await;
    let app = build_test_router(state.clone());

    let response = post(
        &app,
        "/v1/identity",
        &token,
        &json!({
            "user_id": member.id,
            "type": "password",
            "remote_id": "member@example.com",
            "password": "correct horse battery"
        }),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body.get("password").is_none());
    assert!(response.body.get("password_hash").is_none());

    let tables = state.tables.read().await;
    let stored = tables
        .identities
        .iter()
        .find(|i| i.remote_id == "member@example.com")
        .unwrap();
    let hash = stored.password_hash.as_deref().unwrap();
    assert!(verify_password("correct horse battery", hash).unwrap());
}

#[tokio::test]
async fn test_password_rules_follow_identity_type() {
    let (state, member, token) = setup().await;
    let app = build_test_router(state);

    // Password identities need one
    let response = post(
        &app,
        "/v1/identity",
        &token,
        &json!({"user_id": member.id, "type": "password", "remote_id": "a"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Too short
    let response = post(
        &app,
        "/v1/identity",
        &token,
        &json!({"user_id": member.id, "type": "password", "remote_id": "b", "password": "short"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Federated identities never take one
    let response = post(
        &app,
        "/v1/identity",
        &token,
        &json!({"user_id": member.id, "type": "github", "remote_id": "c", "password": "long enough"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_federated_identity_with_claims() {
    let (state, member, token) = setup().await;
    let app = build_test_router(state);

    let response = post(
        &app,
        "/v1/identity",
        &token,
        &json!({
            "user_id": member.id,
            "type": "google",
            "remote_id": "108234",
            "claims": {"email": "member@gmail.example"}
        }),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["type"], "google");
    assert_eq!(response.body["claims"]["email"], "member@gmail.example");
    let id = response.body["id"].as_str().unwrap();
    assert_eq!(
        response.header("location"),
        Some(format!("/v1/identity/{}", id).as_str())
    );
}

#[tokio::test]
async fn test_duplicate_remote_id_conflicts() {
    let (state, member, token) = setup().await;
    let app = build_test_router(state);
    let body = json!({"user_id": member.id, "type": "github", "remote_id": "octocat"});

    assert_eq!(
        post(&app, "/v1/identity", &token, &body).await.status,
        StatusCode::CREATED
    );
    assert_eq!(
        post(&app, "/v1/identity", &token, &body).await.status,
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_list_and_filter_identities() {
    let (state, member, token) = setup().await;
    state.add_identity(&member, "t-1").await;
    let app = build_test_router(state);

    post(
        &app,
        "/v1/identity",
        &token,
        &json!({"user_id": member.id, "type": "github", "remote_id": "octocat"}),
    )
    .await;

    let response = get(&app, &format!("/v1/identity?user={}", member.id), &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("total"), Some("2"));

    let response = get(&app, "/v1/identity?type=github", &token).await;
    assert_eq!(response.header("total"), Some("1"));
    assert_eq!(response.items()[0]["remote_id"], "octocat");

    let response = get(&app, "/v1/identity/search?q=octo", &token).await;
    assert_eq!(response.header("total"), Some("1"));
}

#[tokio::test]
async fn test_identities_of_foreign_users_are_hidden() {
    let state = TestAppState::new();
    let (_, token) = state.regular_token("alice").await;
    let theirs = state.add_application("Theirs", None).await;
    let stranger = state.add_user(theirs.id, "stranger").await;
    let identity = state.add_identity(&stranger, "stranger").await;
    let app = build_test_router(state);

    let response = get(&app, &format!("/v1/identity/{}", identity.id), &token).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = post(
        &app,
        "/v1/identity",
        &token,
        &json!({"user_id": stranger.id, "type": "test", "remote_id": "x"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_identity() {
    let (state, member, token) = setup().await;
    let identity = state.add_identity(&member, "old").await;
    let app = build_test_router(state);
    let path = format!("/v1/identity/{}", identity.id);

    let response = put(
        &app,
        &path,
        &token,
        &json!({"remote_id": "new", "claims": {"k": "v"}}),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["remote_id"], "new");
    assert_eq!(response.body["claims"]["k"], "v");

    // Type is immutable, and a test identity takes no password
    let response = put(&app, &path, &token, &json!({"type": "password"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = put(&app, &path, &token, &json!({"password": "long enough"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_identity_revokes_its_tokens() {
    let (state, member, token) = setup().await;
    let identity = state.add_identity(&member, "doomed").await;
    let app = build_test_router(state.clone());

    let response = delete(&app, &format!("/v1/identity/{}", identity.id), &token).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let tables = state.tables.read().await;
    assert!(tables.identities.iter().all(|i| i.id != identity.id));
    assert!(tables
        .tokens
        .iter()
        .all(|t| t.identity_id != Some(identity.id)));
}
