//! Error response normalization middleware
//!
//! Handler errors already carry the `{"error", "message"}` JSON body of
//! [`AppError`](crate::error::AppError). Rejections produced by the framework
//! itself (unparseable query strings, unknown routes, wrong methods) arrive as
//! text/plain or empty bodies and are rewritten here into the same shape, so
//! parser details never reach the client.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Operational endpoints answer in plain text and are left alone
const PLAIN_TEXT_PATHS: &[&str] = &["/health", "/ready", "/metrics"];

pub async fn normalize_error_response(request: Request<Body>, next: Next) -> Response {
    let plain_text = PLAIN_TEXT_PATHS.contains(&request.uri().path());
    let response = next.run(request).await;

    let status = response.status();
    if plain_text || !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        return response;
    }

    generic_error_response(status)
}

/// Error token and message for a bare framework status
fn describe(status: StatusCode) -> (&'static str, &'static str) {
    match status {
        StatusCode::BAD_REQUEST => ("bad_request", "Invalid request"),
        StatusCode::UNAUTHORIZED => ("unauthorized", "Authentication required"),
        StatusCode::FORBIDDEN => ("forbidden", "Access denied"),
        StatusCode::NOT_FOUND => ("not_found", "Not found"),
        StatusCode::METHOD_NOT_ALLOWED => ("method_not_allowed", "Method not allowed"),
        StatusCode::CONFLICT => ("conflict", "Resource conflict"),
        StatusCode::UNPROCESSABLE_ENTITY => ("bad_request", "Invalid request"),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            ("unsupported_media_type", "Expected a JSON request body")
        }
        s if s.is_client_error() => ("client_error", "Client error"),
        _ => ("internal_error", "An internal error occurred"),
    }
}

fn generic_error_response(status: StatusCode) -> Response {
    let (error, message) = describe(status);
    (status, axum::Json(json!({ "error": error, "message": message }))).into_response()
}
