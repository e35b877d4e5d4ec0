//! The five request-surface operations (§6), as plain async functions over
//! shared process state. The transport that would turn these into HTTP/IPC
//! responses is the actual external collaborator named in §1 — this module
//! stops at the function boundary.

use crate::coordinator::Coordinator;
use crate::domain::models::{SearchResult, Statistics};
use crate::error::{AppError, CommandError};
use crate::store::Store;
use std::sync::Arc;

/// Process-wide bundle of the SQLite pool (via `Store`), the `Coordinator`,
/// and the loaded `Config` (reachable through the coordinator), constructed
/// once in `main`.
pub struct AppState {
    pub store: Arc<Store>,
    pub coordinator: Arc<Coordinator>,
}

/// `statistics`: `{result:true, statistics:{total, detailed[]}}`.
pub async fn statistics(state: &AppState) -> Result<Statistics, CommandError> {
    crate::stats::statistics(&state.store, &state.coordinator)
        .await
        .map_err(CommandError::from)
}

/// `startIndexing`: `{result:true}` or `{result:false, error:"already running"}`.
pub async fn start_indexing(state: &AppState) -> Result<(), CommandError> {
    let started = state.coordinator.start_indexing().await?;
    if !started {
        return Err(AppError::input("already running").into());
    }
    Ok(())
}

/// `stopIndexing`: `{result:true}` or `{result:false, error:"not running"}`.
pub async fn stop_indexing(state: &AppState) -> Result<(), CommandError> {
    let stopped = state.coordinator.stop_indexing().await?;
    if !stopped {
        return Err(AppError::input("not running").into());
    }
    Ok(())
}

/// `indexPage`: `{result:true}` or `{result:false, error:"page not in configured sites"}`.
pub async fn index_page(state: &AppState, url: &str) -> Result<(), CommandError> {
    state.coordinator.index_page(url).await?;
    Ok(())
}

/// `search`: `{result:true, count, data:[...]}` or `{result:false, error}`.
pub async fn search(
    state: &AppState,
    query: &str,
    site: Option<&str>,
    offset: usize,
    limit: usize,
) -> Result<(i64, Vec<SearchResult>), CommandError> {
    let morphology = state.coordinator.morphology();
    crate::search::search(&state.store, morphology, query, site, offset, limit)
        .await
        .map_err(CommandError::from)
}
