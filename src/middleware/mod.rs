//! HTTP middleware for the admin API
//!
//! - Bearer token authentication and the [`Principal`] extractor
//! - Error body normalization for framework rejections
//! - Request metrics and request-id propagation
//! - Span construction that redacts credentials from logged URIs

pub mod auth;
pub mod error_response;
pub mod metrics;
pub mod trace;

pub use auth::Principal;
pub use error_response::normalize_error_response;
pub use metrics::ObservabilityLayer;
pub use trace::SanitizedMakeSpan;
