//! API Handlers
//!
//! HTTP request handlers for each cache gateway endpoint. Every handler goes
//! through the shared [`CacheProvider`], so gateway writes take the same key
//! locks as in-process callers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::CacheProvider;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, DeleteResponse, ExistsResponse, GetResponse, HealthResponse,
    PatternDeleteResponse, PatternQuery, SetRequest, SetResponse, StatsResponse,
};
use crate::store::StoreClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Provider over JSON values
    pub cache: Arc<CacheProvider>,
}

impl AppState {
    /// Creates a new AppState around a provider.
    pub fn new(cache: CacheProvider) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The provider writes to `store` and stripes its locks as configured.
    pub fn from_config(config: &Config, store: Arc<dyn StoreClient>) -> Self {
        Self::new(CacheProvider::new(store).with_lock_stripes(config.lock_stripes))
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /entries/:key
///
/// Stores a JSON value with an optional lifetime. Store failures are logged
/// by the provider and do not fail the request.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    check_key(&key)?;
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state
        .cache
        .add_with_expiration(&key, &req.value, req.expiration())
        .await;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /entries/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    check_key(&key)?;

    match state.cache.get::<Value>(&key).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /entries/:key/exists
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExistsResponse>> {
    check_key(&key)?;

    let exists = state.cache.contains(&key).await?;
    Ok(Json(ExistsResponse::new(key, exists)))
}

/// Handler for DELETE /entries/:key
///
/// Idempotent: deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    check_key(&key)?;

    state.cache.remove(&key).await;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /entries?pattern=<glob>
pub async fn delete_pattern_handler(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> Result<Json<PatternDeleteResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.remove_key_with_pattern(&query.pattern).await;
    Ok(Json(PatternDeleteResponse::new(query.pattern, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.store().name(),
        state.cache.lock_stripes(),
        state.cache.stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.store().name()))
}
