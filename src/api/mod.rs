//! API Module
//!
//! HTTP handlers and routing for the cache gateway.
//!
//! # Endpoints
//! - `GET /cache/:key` - Retrieve a value by key
//! - `PUT /cache/:key` - Store a value
//! - `DELETE /cache/:key` - Delete a key
//! - `POST /cache/:key/refresh` - Refresh a key's sliding expiration
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
