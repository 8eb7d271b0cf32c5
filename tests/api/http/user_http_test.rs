//! User API HTTP Handler Tests

use super::{admin_app_id, build_test_router, delete, get, post, put, TestAppState};
use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_list_users_of_owned_applications() {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let theirs = state.add_application("Theirs", None).await;
    state.add_user(mine.id, "one").await;
    state.add_user(mine.id, "two").await;
    state.add_user(theirs.id, "three").await;
    let app = build_test_router(state);

    let response = get(&app, "/v1/user", &token).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("total"), Some("2"));
    for item in response.items() {
        assert_eq!(item["owner_id"], json!(user.id));
    }
}

#[tokio::test]
async fn test_filter_users_by_role() {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let role = state.add_role(mine.id, "editor").await;
    let app = build_test_router(state.clone());

    for (name, role_id) in [("ed", Some(role.id)), ("plain", None)] {
        let response = post(
            &app,
            "/v1/user",
            &token,
            &json!({"application_id": mine.id, "name": name, "role_id": role_id}),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = get(&app, &format!("/v1/user?role={}", role.id), &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.items().len(), 1);
    assert_eq!(response.items()[0]["name"], "ed");
}

#[tokio::test]
async fn test_search_users_by_name_and_email() {
    let state = TestAppState::new();
    let (_, token) = state.admin_token().await;
    let target = state.add_application("Target", None).await;
    let app = build_test_router(state);

    for (name, email) in [
        ("Jane Doe", "jane@example.com"),
        ("John Roe", "jr@corp.example"),
        ("Zed", "zed@example.com"),
    ] {
        post(
            &app,
            "/v1/user",
            &token,
            &json!({"application_id": target.id, "name": name, "email": email}),
        )
        .await;
    }

    let response = get(
        &app,
        &format!("/v1/user/search?q=corp&application={}", target.id),
        &token,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("total"), Some("1"));
    assert_eq!(response.items()[0]["name"], "John Roe");

    let response = get(
        &app,
        &format!("/v1/user/search?q=jane+zed&application={}", target.id),
        &token,
    )
    .await;
    assert_eq!(response.header("total"), Some("2"));
}

#[tokio::test]
async fn test_create_user_validates_email() {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let app = build_test_router(state);

    let response = post(
        &app,
        "/v1/user",
        &token,
        &json!({"application_id": mine.id, "email": "not-an-email"}),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_email_in_application_conflicts() {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let app = build_test_router(state);
    let body = json!({"application_id": mine.id, "email": "dup@example.com"});

    let first = post(&app, "/v1/user", &token, &body).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(
        first.header("location"),
        Some(format!("/v1/user/{}", first.body["id"].as_str().unwrap()).as_str())
    );

    let second = post(&app, "/v1/user", &token, &body).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_role_must_belong_to_users_application() {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let other = state.add_application("Other", Some(user.id)).await;
    let foreign_role = state.add_role(other.id, "elsewhere").await;
    let app = build_test_router(state);

    let response = post(
        &app,
        "/v1/user",
        &token,
        &json!({"application_id": mine.id, "role_id": foreign_role.id}),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_user_in_admin_application_is_forbidden() {
    let state = TestAppState::new();
    let (_, token) = state.admin_token().await;
    let app = build_test_router(state);

    let response = post(
        &app,
        "/v1/user",
        &token,
        &json!({"application_id": admin_app_id(), "name": "intruder"}),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_user() {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let member = state.add_user(mine.id, "before").await;
    let role = state.add_role(mine.id, "editor").await;
    let app = build_test_router(state);
    let path = format!("/v1/user/{}", member.id);

    let response = put(
        &app,
        &path,
        &token,
        &json!({"name": "after", "role_id": role.id, "email": "after@example.com"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "after");
    assert_eq!(response.body["role_id"], json!(role.id));

    let response = put(
        &app,
        &path,
        &token,
        &json!({"application_id": "00000000-0000-0000-0000-0000000000ee"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_user_cascades_identities_and_tokens() {
    let state = TestAppState::new();
    let (user, token) = state.regular_token("alice").await;
    let mine = state.add_application("Mine", Some(user.id)).await;
    let member = state.add_user(mine.id, "member").await;
    let identity = state.add_identity(&member, "member-remote").await;
    let app = build_test_router(state.clone());

    let response = delete(&app, &format!("/v1/user/{}", member.id), &token).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = get(&app, &format!("/v1/identity/{}", identity.id), &token).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(state.tables.read().await.users.iter().all(|u| u.id != member.id));
}

#[tokio::test]
async fn test_deleting_an_owner_needs_reassignment_first() {
    let state = TestAppState::new();
    let (admin, token) = state.admin_token().await;
    let target = state.add_application("Target", None).await;
    let owner = state.add_user(target.id, "owner").await;
    let owned = state.add_application("Owned", Some(owner.id)).await;
    let app = build_test_router(state);
    let owner_path = format!("/v1/user/{}", owner.id);

    let response = delete(&app, &owner_path, &token).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error(), "conflict");

    let response = get(&app, &format!("/v1/application/{}", owned.id), &token).await;
    assert_eq!(response.body["owner_id"], json!(owner.id));

    let response = put(
        &app,
        &format!("/v1/application/{}/owner", owned.id),
        &token,
        &json!({"owner_id": admin.id}),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = delete(&app, &owner_path, &token).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_admin_users_are_read_only() {
    let state = TestAppState::new();
    let (admin, token) = state.admin_token().await;
    let app = build_test_router(state);
    let path = format!("/v1/user/{}", admin.id);

    let response = get(&app, &path, &token).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = delete(&app, &path, &token).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
