//! # referee-server
//!
//! HTTP service for the manuscript review workflow.
//!
//! This binary provides:
//! - **Author routes** to submit drafts and revisions, attach files and
//!   co-authors, and record reviews
//! - **Journal routes** for editor decisions and reviewer assignment
//! - **Admin routes** for unscoped maintenance
//! - **Per-draft locking** so decisions on one draft never interleave

mod api;
mod config;
mod error;
mod locks;
mod peers;
mod service;
mod workflow;

use tracing::info;
use tracing_subscriber::EnvFilter;

use referee_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,referee_server=debug,referee_store=info")
            }),
        )
        .init();

    info!("Starting referee server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        http_addr = %config.http_addr,
        database = %config.database_path.display(),
        max_body_size = config.max_body_size,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the store and wire the workflow
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path)?;
    let http_addr = config.http_addr;
    let lock_idle_secs = config.lock_idle_secs;
    let app_state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Drop per-draft locks nobody has touched for a while.
    let workflow = app_state.workflow.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(lock_idle_secs.max(1)));
        loop {
            interval.tick().await;
            workflow.locks().purge_stale(lock_idle_secs as f64).await;
            let remaining = workflow.locks().len().await;
            tracing::debug!(remaining, "Purged idle draft locks");
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
