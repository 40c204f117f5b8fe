//! # vigild: vigil daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Initialise the `SQLite` connection pool and run migrations
//! - Build the resource table, the event manager and start the events
//! - Build the axum router and serve it
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vigil_adapter_http_axum::router;
use vigil_adapter_http_axum::state::AppState;
use vigil_adapter_storage_sqlite_sqlx::{SqliteStateStore, SqliteTriggerHistory};
use vigil_app::supervisor::EventManager;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = vigil_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Event manager
    let webhook = vigil_adapter_webhook_reqwest::Config::default().build()?;
    let manager = Arc::new(EventManager::new(
        Arc::new(SqliteStateStore::new(pool.clone())),
        Arc::new(SqliteTriggerHistory::new(pool)),
        Arc::new(webhook),
        config.persistence_settings(),
    ));

    let dependencies = manager.configure(&config.manager)?;
    let table = config.virtual_resources.build();
    for name in dependencies.required.iter().filter(|name| !table.contains(name)) {
        tracing::warn!(resource = %name, "required resource not provided");
    }
    for name in dependencies.optional.iter().filter(|name| !table.contains(name)) {
        tracing::warn!(resource = %name, "notification transport not provided");
    }
    manager.reconfigure(config.manager.clone(), table).await?;

    // HTTP
    let app = router::build(AppState::new(Arc::clone(&manager)));

    let bind_addr = config.bind_addr();
    eprintln!("vigild listening on http://{bind_addr}");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "unable to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
}
