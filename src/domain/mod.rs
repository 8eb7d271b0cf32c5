//! Domain models for the OAuth2 admin API

pub mod application;
pub mod client;
pub mod common;
pub mod identity;
pub mod role;
pub mod token;
pub mod user;

pub use application::*;
pub use client::*;
pub use common::{ensure_unchanged, ApplicationBound, EntityId, Owned};
pub use identity::*;
pub use role::*;
pub use token::*;
pub use user::*;
