//! Application state traits for dependency injection
//!
//! Handlers are generic over [`HasRepositories`], so the same code runs
//! against the production `AppState` (MySQL) and the in-memory test state.

use crate::config::Config;
use crate::policy::AdminAppId;
use crate::repository::{
    ApplicationRepository, ClientRepository, ClientUriRepository, IdentityRepository,
    RoleRepository, ScopeRepository, TokenRepository, UserRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;

/// Trait for application state that provides access to every entity store.
pub trait HasRepositories: Clone + Send + Sync + 'static {
    type ApplicationRepo: ApplicationRepository + 'static;
    type ClientRepo: ClientRepository + 'static;
    type ClientUriRepo: ClientUriRepository + 'static;
    type UserRepo: UserRepository + 'static;
    type IdentityRepo: IdentityRepository + 'static;
    type RoleRepo: RoleRepository + 'static;
    type ScopeRepo: ScopeRepository + 'static;
    type TokenRepo: TokenRepository + 'static;

    /// Get the application configuration
    fn config(&self) -> &Config;

    /// The application whose records are read-only through the API
    fn admin_app(&self) -> AdminAppId {
        self.config().admin_application_id
    }

    fn application_repo(&self) -> &Self::ApplicationRepo;
    fn client_repo(&self) -> &Self::ClientRepo;
    fn client_uri_repo(&self) -> &Self::ClientUriRepo;
    fn user_repo(&self) -> &Self::UserRepo;
    fn identity_repo(&self) -> &Self::IdentityRepo;
    fn role_repo(&self) -> &Self::RoleRepo;
    fn scope_repo(&self) -> &Self::ScopeRepo;
    fn token_repo(&self) -> &Self::TokenRepo;

    /// Prometheus handle, when metrics are enabled
    fn metrics_handle(&self) -> Option<&PrometheusHandle>;

    /// Check if the backing store is reachable
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send;
}
