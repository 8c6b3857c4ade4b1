//! Response DTOs for the product API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::models::Product;

/// Response body for `POST /products/batch`
///
/// `products` is sorted by id; `missing` lists requested ids the store does
/// not hold.
#[derive(Debug, Clone, Serialize)]
pub struct BatchGetResponse {
    pub products: Vec<Product>,
    pub missing: Vec<u64>,
}

impl BatchGetResponse {
    pub fn new(mut products: Vec<Product>, requested: &[u64]) -> Self {
        products.sort_by_key(|p| p.id);
        let mut missing: Vec<u64> = requested
            .iter()
            .copied()
            .filter(|id| products.binary_search_by_key(id, |p| p.id).is_err())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        Self { products, missing }
    }
}

/// Response body for `POST /products/search`
#[derive(Debug, Clone, Serialize)]
pub struct ProductListResponse {
    pub count: usize,
    pub products: Vec<Product>,
}

impl ProductListResponse {
    pub fn new(mut products: Vec<Product>) -> Self {
        products.sort_by_key(|p| p.id);
        Self {
            count: products.len(),
            products,
        }
    }
}

/// Response body for `PUT /products/batch`
#[derive(Debug, Clone, Serialize)]
pub struct PutBatchResponse {
    pub stored: usize,
    pub products: Vec<Product>,
}

impl PutBatchResponse {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            stored: products.len(),
            products,
        }
    }
}

/// Response body for the cache invalidation endpoints
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Cache mappings that existed and were removed
    pub invalidated: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
