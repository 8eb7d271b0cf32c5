//! Client redirect/referrer URI HTTP Handler Tests

use super::{build_test_router, delete, get, post, put, TestAppState, TestResponse};
use axum::{http::StatusCode, Router};
use oauth2_admin::domain::{Client, ClientType};
use pretty_assertions::assert_eq;
use serde_json::json;

async fn setup() -> (TestAppState, Client, String) {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let client = state.add_client(&mine, ClientType::AuthorizationGrant).await;
    (state, client, token)
}

async fn register(app: &Router, client: &Client, kind: &str, uri: &str, token: &str) -> TestResponse {
    post(
        app,
        &format!("/v1/client/{}/{}", client.id, kind),
        token,
        &json!({"uri": uri}),
    )
    .await
}

#[tokio::test]
async fn test_register_and_get_redirect_uri() {
    let (state, client, token) = setup().await;
    let app = build_test_router(state);

    let response = register(&app, &client, "redirect", "https://example.com/cb", &token).await;
    assert_eq!(response.status, StatusCode::CREATED);
    let id = response.body["id"].as_str().unwrap().to_string();
    let location = format!("/v1/client/{}/redirect/{}", client.id, id);
    assert_eq!(response.header("location"), Some(location.as_str()));

    let response = get(&app, &location, &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["uri"], "https://example.com/cb");
    assert_eq!(response.body["client_id"], json!(client.id));
}

#[tokio::test]
async fn test_kinds_are_listed_separately() {
    let (state, client, token) = setup().await;
    let app = build_test_router(state);

    register(&app, &client, "redirect", "https://example.com/a", &token).await;
    register(&app, &client, "redirect", "https://example.com/b", &token).await;
    register(&app, &client, "referrer", "https://example.com", &token).await;

    let redirects = get(&app, &format!("/v1/client/{}/redirect", client.id), &token).await;
    assert_eq!(redirects.status, StatusCode::OK);
    assert_eq!(redirects.header("total"), Some("2"));

    let referrers = get(&app, &format!("/v1/client/{}/referrer", client.id), &token).await;
    assert_eq!(referrers.header("total"), Some("1"));
}

#[tokio::test]
async fn test_uri_is_not_visible_under_other_kind() {
    let (state, client, token) = setup().await;
    let app = build_test_router(state);

    let response = register(&app, &client, "redirect", "https://example.com/cb", &token).await;
    let id = response.body["id"].as_str().unwrap().to_string();

    let response = get(
        &app,
        &format!("/v1/client/{}/referrer/{}", client.id, id),
        &token,
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_kind_is_not_found() {
    let (state, client, token) = setup().await;
    let app = build_test_router(state);

    let response = get(&app, &format!("/v1/client/{}/callback", client.id), &token).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_uri_is_rejected() {
    let (state, client, token) = setup().await;
    let app = build_test_router(state);

    let response = register(&app, &client, "redirect", "not a uri", &token).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let long = format!("https://example.com/{}", "a".repeat(700));
    let response = register(&app, &client, "redirect", &long, &token).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_uri_conflicts() {
    let (state, client, token) = setup().await;
    let app = build_test_router(state);

    let first = register(&app, &client, "redirect", "https://example.com/cb", &token).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = register(&app, &client, "redirect", "https://example.com/cb", &token).await;
    assert_eq!(second.status, StatusCode::CONFLICT);

    // The same address may still be a referrer
    let referrer = register(&app, &client, "referrer", "https://example.com/cb", &token).await;
    assert_eq!(referrer.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_update_and_delete_uri() {
    let (state, client, token) = setup().await;
    let app = build_test_router(state);

    let response = register(&app, &client, "redirect", "https://example.com/old", &token).await;
    let id = response.body["id"].as_str().unwrap().to_string();
    let path = format!("/v1/client/{}/redirect/{}", client.id, id);

    let response = put(
        &app,
        &path,
        &token,
        &json!({"id": id, "client_id": client.id, "uri": "https://example.com/new"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["uri"], "https://example.com/new");

    let response = delete(&app, &path, &token).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = get(&app, &path, &token).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_cannot_move_uri_to_another_client() {
    let (state, client, token) = setup().await;
    let app = build_test_router(state);

    let response = register(&app, &client, "redirect", "https://example.com/cb", &token).await;
    let id = response.body["id"].as_str().unwrap().to_string();

    let response = put(
        &app,
        &format!("/v1/client/{}/redirect/{}", client.id, id),
        &token,
        &json!({"client_id": "00000000-0000-0000-0000-0000000000dd", "uri": "https://example.com/x"}),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_foreign_client_is_bad_request() {
    let state = TestAppState::new();
    let (_, token) = state.regular_token("alice").await;
    let theirs = state.add_application("Theirs", None).await;
    let client = state.add_client(&theirs, ClientType::Implicit).await;
    let app = build_test_router(state);

    let response = get(&app, &format!("/v1/client/{}/redirect", client.id), &token).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = register(&app, &client, "redirect", "https://example.com/cb", &token).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_console_client_uris_are_read_only() {
    let state = TestAppState::new();
    let (_, token) = state.admin_token().await;
    let console = format!("/v1/client/{}/redirect", state.console_client_id);
    let app = build_test_router(state);

    let response = get(&app, &console, &token).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = post(&app, &console, &token, &json!({"uri": "https://evil.example"})).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
