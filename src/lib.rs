//! jobdeck -- job dashboard core.
//!
//! This crate computes next-run instants for calendar-anchored recurring
//! jobs, keeps an in-memory register of job execution results, and exposes
//! both over a small JSON API and CLI.

pub mod api;
pub mod config;
pub mod scheduler;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::state::AppState;
use crate::config::Config;
use crate::scheduler::{CommandRunner, Dispatcher, StaticCatalog};
use crate::storage::ResultStore;

/// Wire the store, catalog, runner and calculator described by `config`.
pub fn build_state(config: &Config) -> Result<AppState> {
    let calculator = config.schedule.calculator()?;
    let store = Arc::new(ResultStore::new(config.results.history_capacity));
    let dispatcher = Dispatcher::new(
        Arc::new(StaticCatalog::new(config.jobs.clone())),
        Arc::new(CommandRunner::new(config.runner.timeout())),
        store,
    );
    Ok(AppState::new(calculator, dispatcher))
}

/// Start the jobdeck API server.
pub async fn serve(config: &Config) -> Result<()> {
    let state = build_state(config)?;

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;
    let app = api::router(state);

    tracing::info!(%addr, jobs = config.jobs.len(), "jobdeck listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
