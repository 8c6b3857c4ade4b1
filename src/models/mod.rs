//! Domain entity and HTTP DTOs
//!
//! `Product` is the entity the service caches; the request/response types
//! shape the JSON bodies of the product endpoints.

pub mod product;
pub mod requests;
pub mod responses;

pub use product::Product;
pub use requests::{BatchGetRequest, InvalidateRequest, SearchRequest};
pub use responses::{
    BatchGetResponse, ErrorResponse, HealthResponse, InvalidateResponse, ProductListResponse,
    PutBatchResponse,
};
