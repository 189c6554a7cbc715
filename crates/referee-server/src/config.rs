//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use referee_shared::constants::DEFAULT_HTTP_PORT;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./referee.db`
    pub database_path: PathBuf,

    /// Password given to reviewer accounts provisioned on assignment.
    /// Env: `DEFAULT_REVIEWER_PASSWORD`
    /// Default: a development-only value.
    pub default_reviewer_password: String,

    /// Maximum request body size in bytes (2 MiB).
    /// Env: `MAX_BODY_SIZE`
    pub max_body_size: usize,

    /// Per-draft locks idle for longer than this are dropped.
    /// Env: `LOCK_IDLE_SECS`
    /// Default: `600`
    pub lock_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./referee.db"),
            default_reviewer_password: "change-me-reviewer".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2 MiB
            lock_idle_secs: 600,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH").filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        match var("DEFAULT_REVIEWER_PASSWORD") {
            Some(pw) if !pw.is_empty() => config.default_reviewer_password = pw,
            _ => tracing::warn!("DEFAULT_REVIEWER_PASSWORD not set, using development default"),
        }

        if let Some(val) = var("MAX_BODY_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_body_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BODY_SIZE, using default"),
            }
        }

        if let Some(val) = var("LOCK_IDLE_SECS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.lock_idle_secs = n,
                _ => tracing::warn!(value = %val, "Invalid LOCK_IDLE_SECS, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}
