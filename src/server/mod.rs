//! Server initialization and routing

use crate::api::{self, API_PREFIX};
use crate::config::Config;
use crate::middleware::{normalize_error_response, ObservabilityLayer, SanitizedMakeSpan};
use crate::repository::{
    ApplicationRepositoryImpl, ClientRepositoryImpl, ClientUriRepositoryImpl,
    IdentityRepositoryImpl, RoleRepositoryImpl, ScopeRepositoryImpl, TokenRepositoryImpl,
    UserRepositoryImpl,
};
use crate::state::HasRepositories;
use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub application_repo: Arc<ApplicationRepositoryImpl>,
    pub client_repo: Arc<ClientRepositoryImpl>,
    pub client_uri_repo: Arc<ClientUriRepositoryImpl>,
    pub user_repo: Arc<UserRepositoryImpl>,
    pub identity_repo: Arc<IdentityRepositoryImpl>,
    pub role_repo: Arc<RoleRepositoryImpl>,
    pub scope_repo: Arc<ScopeRepositoryImpl>,
    pub token_repo: Arc<TokenRepositoryImpl>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, db_pool: MySqlPool, metrics_handle: Option<PrometheusHandle>) -> Self {
        Self {
            config: Arc::new(config),
            application_repo: Arc::new(ApplicationRepositoryImpl::new(db_pool.clone())),
            client_repo: Arc::new(ClientRepositoryImpl::new(db_pool.clone())),
            client_uri_repo: Arc::new(ClientUriRepositoryImpl::new(db_pool.clone())),
            user_repo: Arc::new(UserRepositoryImpl::new(db_pool.clone())),
            identity_repo: Arc::new(IdentityRepositoryImpl::new(db_pool.clone())),
            role_repo: Arc::new(RoleRepositoryImpl::new(db_pool.clone())),
            scope_repo: Arc::new(ScopeRepositoryImpl::new(db_pool.clone())),
            token_repo: Arc::new(TokenRepositoryImpl::new(db_pool.clone())),
            db_pool,
            metrics_handle,
        }
    }
}

impl HasRepositories for AppState {
    type ApplicationRepo = ApplicationRepositoryImpl;
    type ClientRepo = ClientRepositoryImpl;
    type ClientUriRepo = ClientUriRepositoryImpl;
    type UserRepo = UserRepositoryImpl;
    type IdentityRepo = IdentityRepositoryImpl;
    type RoleRepo = RoleRepositoryImpl;
    type ScopeRepo = ScopeRepositoryImpl;
    type TokenRepo = TokenRepositoryImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn application_repo(&self) -> &Self::ApplicationRepo {
        &self.application_repo
    }

    fn client_repo(&self) -> &Self::ClientRepo {
        &self.client_repo
    }

    fn client_uri_repo(&self) -> &Self::ClientUriRepo {
        &self.client_uri_repo
    }

    fn user_repo(&self) -> &Self::UserRepo {
        &self.user_repo
    }

    fn identity_repo(&self) -> &Self::IdentityRepo {
        &self.identity_repo
    }

    fn role_repo(&self) -> &Self::RoleRepo {
        &self.role_repo
    }

    fn scope_repo(&self) -> &Self::ScopeRepo {
        &self.scope_repo
    }

    fn token_repo(&self) -> &Self::TokenRepo {
        &self.token_repo
    }

    fn metrics_handle(&self) -> Option<&PrometheusHandle> {
        self.metrics_handle.as_ref()
    }

    async fn check_ready(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.db_pool)
            .await
            .is_ok()
    }
}

/// Connect to the database and serve HTTP until a shutdown signal arrives
pub async fn run(config: Config, metrics_handle: Option<PrometheusHandle>) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    let http_addr = config.http_addr();
    let state = AppState::new(config, db_pool.clone(), metrics_handle);
    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}

/// Routes of the resource API, relative to [`API_PREFIX`]
fn api_routes<S: HasRepositories>() -> Router<S> {
    Router::new()
        // Applications
        .route(
            "/application",
            get(api::application::list::<S>).post(api::application::create::<S>),
        )
        .route("/application/search", get(api::application::search::<S>))
        .route(
            "/application/{id}",
            get(api::application::get::<S>)
                .put(api::application::update::<S>)
                .delete(api::application::delete::<S>),
        )
        .route(
            "/application/{id}/owner",
            put(api::application::assign_owner::<S>),
        )
        // Clients and their redirect/referrer URIs
        .route(
            "/client",
            get(api::client::list::<S>).post(api::client::create::<S>),
        )
        .route("/client/search", get(api::client::search::<S>))
        .route(
            "/client/{id}",
            get(api::client::get::<S>)
                .put(api::client::update::<S>)
                .delete(api::client::delete::<S>),
        )
        .route(
            "/client/{id}/{kind}",
            get(api::client_uri::list::<S>).post(api::client_uri::create::<S>),
        )
        .route(
            "/client/{id}/{kind}/{uri_id}",
            get(api::client_uri::get::<S>)
                .put(api::client_uri::update::<S>)
                .delete(api::client_uri::delete::<S>),
        )
        // Users
        .route(
            "/user",
            get(api::user::list::<S>).post(api::user::create::<S>),
        )
        .route("/user/search", get(api::user::search::<S>))
        .route(
            "/user/{id}",
            get(api::user::get::<S>)
                .put(api::user::update::<S>)
                .delete(api::user::delete::<S>),
        )
        // Identities
        .route(
            "/identity",
            get(api::identity::list::<S>).post(api::identity::create::<S>),
        )
        .route("/identity/search", get(api::identity::search::<S>))
        .route(
            "/identity/{id}",
            get(api::identity::get::<S>)
                .put(api::identity::update::<S>)
                .delete(api::identity::delete::<S>),
        )
        // Roles
        .route(
            "/role",
            get(api::role::list::<S>).post(api::role::create::<S>),
        )
        .route("/role/search", get(api::role::search::<S>))
        .route(
            "/role/{id}",
            get(api::role::get::<S>)
                .put(api::role::update::<S>)
                .delete(api::role::delete::<S>),
        )
        .route(
            "/role/{id}/scope/{scope_id}",
            post(api::role::add_scope::<S>).delete(api::role::remove_scope::<S>),
        )
        // Scopes
        .route(
            "/scope",
            get(api::scope::list::<S>).post(api::scope::create::<S>),
        )
        .route("/scope/search", get(api::scope::search::<S>))
        .route(
            "/scope/{id}",
            get(api::scope::get::<S>)
                .put(api::scope::update::<S>)
                .delete(api::scope::delete::<S>),
        )
        // Tokens
        .route(
            "/token",
            get(api::token::list::<S>).post(api::token::create::<S>),
        )
        .route("/token/search", get(api::token::search::<S>))
        .route(
            "/token/{id}",
            get(api::token::get::<S>).delete(api::token::delete::<S>),
        )
}

/// Build the HTTP router with generic state type
///
/// This function is generic over the state type, allowing it to work with
/// both production `AppState` and test implementations that implement `HasRepositories`.
pub fn build_router<S: HasRepositories>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Operational endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/metrics", get(api::metrics::metrics_handler::<S>))
        .nest(API_PREFIX, api_routes::<S>())
        // Add middleware
        .layer(axum::middleware::from_fn(normalize_error_response))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(cors)
        .layer(ObservabilityLayer)
        .with_state(state)
}
