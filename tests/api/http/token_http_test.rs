//! Token API HTTP Handler Tests

use super::{build_test_router, delete, get, post, TestAppState};
use axum::http::{Method, StatusCode};
use oauth2_admin::domain::{Application, Client, ClientType};
use pretty_assertions::assert_eq;
use serde_json::json;

async fn setup() -> (TestAppState, Application, Client, String) {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let client = state.add_client(&mine, ClientType::OwnerCredentials).await;
    (state, mine, client, token)
}

#[tokio::test]
async fn test_issue_token_for_identity() {
    let (state, mine, client, token) = setup().await;
    let member = state.add_user(mine.id, "member").await;
    let identity = state.add_identity(&member, "member").await;
    let read = state.add_scope(mine.id, "read").await;
    let app = build_test_router(state);

    let response = post(
        &app,
        "/v1/token",
        &token,
        &json!({
            "client_id": client.id,
            "identity_id": identity.id,
            "expires_in": 600,
            "scopes": [read.id]
        }),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["type"], "bearer");
    assert_eq!(response.body["expires_in"], 600);
    assert_eq!(response.body["user_id"], json!(member.id));
    assert_eq!(response.body["client_name"], json!(client.name));
    assert_eq!(response.body["scopes"], json!(["read"]));
    let id = response.body["id"].as_str().unwrap();
    assert_eq!(
        response.header("location"),
        Some(format!("/v1/token/{}", id).as_str())
    );
}

#[tokio::test]
async fn test_issue_client_token_uses_defaults() {
    let (state, _, client, token) = setup().await;
    let app = build_test_router(state);

    let response = post(&app, "/v1/token", &token, &json!({"client_id": client.id})).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["type"], "bearer");
    assert_eq!(response.body["identity_id"], json!(null));
    assert_eq!(response.body["scopes"], json!([]));
    assert!(response.body["expires_in"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_identity_from_another_application_is_rejected() {
    let (state, _, client, token) = setup().await;
    let elsewhere = state.add_application("Elsewhere", None).await;
    let stranger = state.add_user(elsewhere.id, "stranger").await;
    let identity = state.add_identity(&stranger, "stranger").await;
    let app = build_test_router(state);

    let response = post(
        &app,
        "/v1/token",
        &token,
        &json!({"client_id": client.id, "identity_id": identity.id}),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scope_from_another_application_is_rejected() {
    let (state, _, client, token) = setup().await;
    let elsewhere = state.add_application("Elsewhere", None).await;
    let scope = state.add_scope(elsewhere.id, "read").await;
    let app = build_test_router(state);

    let response = post(
        &app,
        "/v1/token",
        &token,
        &json!({"client_id": client.id, "scopes": [scope.id]}),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_issue_for_foreign_or_console_client_is_rejected() {
    let state = TestAppState::new();
    let (_, token) = state.regular_token("alice").await;
    let theirs = state.add_application("Theirs", None).await;
    let client = state.add_client(&theirs, ClientType::Implicit).await;
    let console_client_id = state.console_client_id;
    let (_, admin) = state.admin_token().await;
    let app = build_test_router(state);

    let response = post(&app, "/v1/token", &token, &json!({"client_id": client.id})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // Admin-application tokens are never minted through the API
    let response = post(
        &app,
        "/v1/token",
        &admin,
        &json!({"client_id": console_client_id}),
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_filter_and_search_tokens() {
    let (state, mine, client, token) = setup().await;
    let member = state.add_user(mine.id, "member").await;
    let identity = state.add_identity(&member, "member").await;
    let app = build_test_router(state);

    post(&app, "/v1/token", &token, &json!({"client_id": client.id})).await;
    post(
        &app,
        "/v1/token",
        &token,
        &json!({"client_id": client.id, "identity_id": identity.id, "type": "refresh"}),
    )
    .await;

    // The caller's own console token belongs to the admin application
    let response = get(&app, "/v1/token", &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("total"), Some("2"));

    let response = get(&app, &format!("/v1/token?identity={}", identity.id), &token).await;
    assert_eq!(response.header("total"), Some("1"));

    let response = get(&app, "/v1/token?type=refresh", &token).await;
    assert_eq!(response.header("total"), Some("1"));

    let response = get(&app, &format!("/v1/token?client={}", client.id), &token).await;
    assert_eq!(response.header("total"), Some("2"));

    let response = get(&app, "/v1/token/search?q=mine", &token).await;
    assert_eq!(response.header("total"), Some("2"));
}

#[tokio::test]
async fn test_tokens_are_immutable() {
    let (state, _, client, token) = setup().await;
    let app = build_test_router(state);

    let response = post(&app, "/v1/token", &token, &json!({"client_id": client.id})).await;
    let path = format!("/v1/token/{}", response.body["id"].as_str().unwrap());

    let response = super::send(&app, Method::PUT, &path, Some(&token), Some(&json!({}))).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.error(), "method_not_allowed");
}

#[tokio::test]
async fn test_revoke_token() {
    let (state, _, client, token) = setup().await;
    let app = build_test_router(state);

    let response = post(&app, "/v1/token", &token, &json!({"client_id": client.id})).await;
    let path = format!("/v1/token/{}", response.body["id"].as_str().unwrap());

    assert_eq!(get(&app, &path, &token).await.status, StatusCode::OK);
    assert_eq!(delete(&app, &path, &token).await.status, StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &path, &token).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_issued_token_cannot_call_admin_api() {
    let state = TestAppState::new();
    let (_, admin) = state.admin_token().await;
    let target = state.add_application("Target", None).await;
    let client = state.add_client(&target, ClientType::ClientCredentials).await;
    let app = build_test_router(state);

    let response = post(&app, "/v1/token", &admin, &json!({"client_id": client.id})).await;
    let issued = response.body["id"].as_str().unwrap().to_string();

    let response = get(&app, "/v1/application", &issued).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "unauthorized");
}

#[tokio::test]
async fn test_admin_named_scope_of_own_application_grants_nothing() {
    let state = TestAppState::new();
    let (_, token) = state.regular_token("mallory").await;
    let victim = state.add_application("Victim", None).await;
    let app = build_test_router(state);

    let victim_path = format!("/v1/application/{}", victim.id);
    assert_eq!(get(&app, &victim_path, &token).await.status, StatusCode::NOT_FOUND);

    let mine = post(&app, "/v1/application", &token, &json!({"name": "Mine"})).await;
    assert_eq!(mine.status, StatusCode::CREATED);
    let scope = post(
        &app,
        "/v1/scope",
        &token,
        &json!({"application_id": mine.body["id"], "name": "application_admin"}),
    )
    .await;
    assert_eq!(scope.status, StatusCode::CREATED);
    let client = post(
        &app,
        "/v1/client",
        &token,
        &json!({
            "application_id": mine.body["id"],
            "name": "Mine",
            "type": "client_credentials"
        }),
    )
    .await;
    assert_eq!(client.status, StatusCode::CREATED);

    let issued = post(
        &app,
        "/v1/token",
        &token,
        &json!({"client_id": client.body["id"], "scopes": [scope.body["id"]]}),
    )
    .await;
    assert_eq!(issued.status, StatusCode::CREATED);
    assert_eq!(issued.body["scopes"], json!(["application_admin"]));

    let forged = issued.body["id"].as_str().unwrap().to_string();
    assert_eq!(get(&app, &victim_path, &forged).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(get(&app, "/v1/application", &forged).await.status, StatusCode::UNAUTHORIZED);
}
