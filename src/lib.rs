//! OAuth2 Admin - administrative REST API for an OAuth2 server
//!
//! Manages applications, clients, users, identities, roles, scopes and
//! tokens. Every request is authorized by the scopes of the caller's bearer
//! token combined with ownership of the addressed records.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod policy;
pub mod query;
pub mod repository;
pub mod server;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
