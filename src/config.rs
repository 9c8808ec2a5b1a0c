//! # Configuration Management
//!
//! This module handles loading configuration from environment variables,
//! following the "12-factor app" methodology.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 4000)
//! - `DATABASE_URL`: SQLite connection string
//! - `SESSION_LIFETIME_HOURS`: Idle session lifetime (default: 12)
//! - `REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 10)

use anyhow::Result;
use std::env;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to.
    pub host: String,

    /// Server port number.
    pub port: u16,

    /// SQLite database connection URL.
    /// Format: "sqlite:snipbox.db?mode=rwc" (read, write, create).
    pub database_url: String,

    /// How long a session survives without activity. Sessions expire this
    /// long after their last save; expired records read as absent.
    pub session_lifetime: Duration,

    /// Deadline for a single request passing through the middleware chain.
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// development defaults. A `.env` file is honored if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let session_hours: u64 = env::var("SESSION_LIFETIME_HOURS")
            .unwrap_or_else(|_| "12".to_string())
            .parse()?;

        let timeout_secs: u64 = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:snipbox.db?mode=rwc".to_string()),

            session_lifetime: Duration::from_secs(session_hours * 3600),

            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Socket address to bind the TCP listener to, e.g. "127.0.0.1:4000".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
