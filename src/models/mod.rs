//! Request and Response models for the cache gateway API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! deserializing query parameters and serializing JSON response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_key, SetParams};
pub use responses::{DeleteResponse, HealthResponse, RefreshResponse, SetResponse};
