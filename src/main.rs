//! OAuth2 admin API server binary
//!
//! ```bash
//! oauth2-admin              # serve the API (default)
//! oauth2-admin migrate      # create the database and run migrations
//! oauth2-admin bootstrap    # migrate, then seed the admin application
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use oauth2_admin::{config::Config, migration, server, telemetry};
use tracing::info;

/// Administrative REST API for an OAuth2 server
#[derive(Parser, Debug)]
#[command(name = "oauth2-admin")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// Create the database if needed and run migrations
    Migrate,
    /// Run migrations and seed the admin application, scopes, roles and user
    Bootstrap,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let metrics_handle = telemetry::init(&config.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                "Starting OAuth2 admin API"
            );
            info!("HTTP server listening on {}", config.http_addr());
            server::run(config, metrics_handle).await
        }
        Command::Migrate => migration::run_migrations(&config).await,
        Command::Bootstrap => migration::bootstrap(&config).await,
    }
}
