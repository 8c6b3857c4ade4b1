//! API Handlers
//!
//! HTTP request handlers for the product and cache endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::models::{
    BatchGetRequest, BatchGetResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
    Product, ProductListResponse, PutBatchResponse, SearchRequest,
};
use crate::repository::{Repository, RepositoryStats};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Write-through or write-behind repository, chosen at startup
    pub repository: Arc<dyn Repository<Product>>,
}

impl AppState {
    pub fn new(repository: Arc<dyn Repository<Product>>) -> Self {
        Self { repository }
    }
}

/// Handler for GET /products/:id
pub async fn get_product_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Product>> {
    state
        .repository
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| StoreError::NotFound(format!("Product {} not found", id)))
}

/// Handler for GET /products/:id/fresh
///
/// Reads the durable row, skipping the cache.
pub async fn get_fresh_product_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Product>> {
    state
        .repository
        .find_fresh_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| StoreError::NotFound(format!("Product {} not found in store", id)))
}

/// Handler for POST /products/batch
pub async fn batch_get_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchGetRequest>,
) -> Result<Json<BatchGetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(StoreError::InvalidRequest(error_msg));
    }

    let found = state.repository.get_all(&req.ids).await?;
    debug!(requested = req.ids.len(), found = found.len(), "Batch get");
    Ok(Json(BatchGetResponse::new(
        found.into_values().collect(),
        &req.ids,
    )))
}

/// Handler for POST /products/search
pub async fn search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<ProductListResponse>> {
    let products = state.repository.find_all(req.predicate.as_ref()).await?;
    Ok(Json(ProductListResponse::new(products)))
}

/// Handler for PUT /products
///
/// Returns the product as the repository will serve it, including a
/// store-assigned id in write-through mode.
pub async fn put_product_handler(
    State(state): State<AppState>,
    Json(product): Json<Product>,
) -> Result<Json<Product>> {
    let stored = state.repository.put(product).await?;
    Ok(Json(stored))
}

/// Handler for PUT /products/batch
pub async fn put_batch_handler(
    State(state): State<AppState>,
    Json(products): Json<Vec<Product>>,
) -> Result<Json<PutBatchResponse>> {
    let stored = state.repository.put_all(products).await?;
    Ok(Json(PutBatchResponse::new(stored)))
}

/// Handler for DELETE /cache/products/:id
///
/// Drops the cached mapping only; the store row is untouched.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<InvalidateResponse>> {
    let existed = state.repository.invalidate(&id).await?;
    Ok(Json(InvalidateResponse {
        invalidated: usize::from(existed),
    }))
}

/// Handler for POST /cache/products/invalidate
pub async fn invalidate_many_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let invalidated = match req.ids {
        Some(ids) => state.repository.invalidate_many(&ids).await?,
        None => state.repository.invalidate_all().await?,
    };
    Ok(Json(InvalidateResponse { invalidated }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<RepositoryStats> {
    Json(state.repository.stats().await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
