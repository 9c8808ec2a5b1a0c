//! # Snipbox
//!
//! A server-rendered snippet-sharing application: anyone can browse snippets,
//! signed-up users can create them.
//!
//! ## Key Concepts
//! - **Template cache**: every page template is registered and verified at
//!   startup, so rendering never compiles anything per request
//! - **Session pipeline**: cookie-keyed server-side sessions with token
//!   rotation on privilege changes
//! - **Layered middleware**: recovery, tracing, timeout, security headers,
//!   session, CSRF and authentication composed in a fixed order in `routes`

mod config;
mod db;
mod error;
mod forms;
mod handlers;
mod middleware;
mod routes;
mod session;
mod state;
mod templates;

use crate::config::Config;
use crate::state::AppState;
// Structured logging setup
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: info level for most crates, debug for our own.
    // Can be overridden with RUST_LOG.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,snipbox=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables and .env file
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    // Connects the database, runs migrations and builds the template cache.
    // A defective template aborts startup here rather than failing a request.
    let app_state = AppState::new(&config).await?;
    tracing::info!("Application state initialized");

    let app = routes::router(app_state);

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
