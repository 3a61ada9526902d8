//! API Module
//!
//! HTTP handlers and routing for the cache gateway REST API.
//!
//! # Endpoints
//! - `PUT /entries/:key` - Store a JSON value
//! - `GET /entries/:key` - Retrieve a value by key
//! - `GET /entries/:key/exists` - Check a key
//! - `DELETE /entries/:key` - Delete a key
//! - `DELETE /entries?pattern=<glob>` - Delete keys matching a pattern
//! - `GET /stats` - Get provider statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
