//! API Module
//!
//! HTTP handlers and routing for serving a cache driver over REST.
//!
//! # Endpoints
//! - `PUT /items` - Store a value under a key path
//! - `GET /items/*path` - Retrieve a record
//! - `DELETE /items[/*path]` - Clear a subtree or the whole namespace
//! - `POST /purge` - Sweep expired entries
//! - `GET /stats`, `GET /health`, `GET /drivers`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
