//! API Handlers
//!
//! HTTP request handlers for each cache gateway endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tokio_util::sync::CancellationToken;

use crate::cache::DistributedCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, DeleteResponse, HealthResponse, RefreshResponse, SetParams, SetResponse,
};
use crate::store::InMemoryStore;

/// Application state shared across all handlers.
///
/// Holds the cache engine and the shutdown token passed to every cache
/// call, so in-flight requests stop before their next store call once the
/// server begins shutting down.
#[derive(Clone)]
pub struct AppState {
    /// Cache engine, cheap to clone
    pub cache: DistributedCache,
    /// Cancelled on shutdown
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: DistributedCache) -> Self {
        Self {
            cache,
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Backs the cache with an in-memory store holding the configured table.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(InMemoryStore::with_table(
            config.cache.cache_table_name.clone(),
        ));
        let cache = DistributedCache::new(store, config.cache.clone())?;
        Ok(Self::new(cache))
    }
}

fn checked_key(key: String) -> Result<String> {
    match validate_key(&key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(key),
    }
}

/// Handler for PUT /cache/:key
///
/// Stores the raw request body under `key`.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<SetParams>,
    body: Bytes,
) -> Result<Json<SetResponse>> {
    let key = checked_key(key)?;
    let options = params
        .to_entry_options()
        .map_err(CacheError::InvalidRequest)?;

    state
        .cache
        .set(&key, body.to_vec(), &options, &state.shutdown)
        .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /cache/:key
///
/// Returns the cached bytes as `application/octet-stream`.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let key = checked_key(key)?;

    match state.cache.get(&key, &state.shutdown).await? {
        Some(content) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            content,
        )
            .into_response()),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for POST /cache/:key/refresh
///
/// Extends the key's sliding window. Absent keys are not an error.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RefreshResponse>> {
    let key = checked_key(key)?;
    state.cache.refresh(&key, &state.shutdown).await?;

    Ok(Json(RefreshResponse::new(key)))
}

/// Handler for DELETE /cache/:key
///
/// Deletes a key from the cache. Absent keys are not an error.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let key = checked_key(key)?;
    state.cache.remove(&key, &state.shutdown).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
