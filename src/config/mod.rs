//! Configuration management for the admin API

use anyhow::{Context, Result};
use std::env;
use uuid::Uuid;

use crate::policy::AdminAppId;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Deployment environment ("development", "production", ...)
    pub environment: String,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Id of the bootstrap admin application, whose records are read-only
    pub admin_application_id: AdminAppId,
    /// Telemetry configuration
    pub telemetry: TelemetryConfig,
    /// Credentials for the bootstrap admin user
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "pretty"
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}

#[derive(Clone)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_password: Option<String>,
}

// Keep the password out of logs
impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("admin_username", &self.admin_username)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let admin_application_id = lookup("ADMIN_APPLICATION_ID")
            .context("ADMIN_APPLICATION_ID is required")?;
        let admin_application_id = Uuid::parse_str(admin_application_id.trim())
            .context("Invalid ADMIN_APPLICATION_ID")?;

        Ok(Self {
            http_host: var_or("HTTP_HOST", "0.0.0.0"),
            http_port: var_or("HTTP_PORT", "8080")
                .parse()
                .context("Invalid HTTP_PORT")?,
            environment: var_or("ENVIRONMENT", "development"),
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", "10")
                    .parse()
                    .unwrap_or(10),
                min_connections: var_or("DATABASE_MIN_CONNECTIONS", "2")
                    .parse()
                    .unwrap_or(2),
            },
            admin_application_id: AdminAppId::new(admin_application_id.into()),
            telemetry: TelemetryConfig {
                log_format: var_or("LOG_FORMAT", "pretty").to_lowercase(),
                metrics_enabled: var_or("METRICS_ENABLED", "true").to_lowercase() == "true",
            },
            bootstrap: BootstrapConfig {
                admin_username: var_or("ADMIN_USERNAME", "admin"),
                admin_password: lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
