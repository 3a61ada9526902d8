//! Request and Response models for the cache gateway API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_key, PatternQuery, SetRequest};
pub use responses::{
    DeleteResponse, ErrorResponse, ExistsResponse, GetResponse, HealthResponse,
    PatternDeleteResponse, SetResponse, StatsResponse,
};
