//! API Module
//!
//! HTTP handlers and routing for the product service.
//!
//! # Endpoints
//! - `GET /products/:id` - Cached read, 404 when absent
//! - `GET /products/:id/fresh` - Durable read, bypasses the cache
//! - `POST /products/batch` - Batch read by ids
//! - `POST /products/search` - Predicate scan against the store
//! - `PUT /products` / `PUT /products/batch` - Writes
//! - `DELETE /cache/products/:id` - Invalidate one cached entry
//! - `POST /cache/products/invalidate` - Invalidate many, or everything
//! - `GET /stats` - Cache and write-behind statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
