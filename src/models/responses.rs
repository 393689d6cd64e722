//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::driver::{DriverKind, DriverStats, KeyPath, StoredRecord, Timestamp};

/// Response body for GET /items/*path
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested path
    pub path: String,
    /// The stored value
    pub value: Value,
    /// Expiration requested when the value was stored
    pub expiration: Timestamp,
    /// Seconds until that expiration
    pub remaining: u64,
}

impl GetResponse {
    pub fn new(path: &KeyPath, record: StoredRecord, now: Timestamp) -> Self {
        Self {
            path: path.to_string(),
            remaining: record.remaining(now),
            value: record.data,
            expiration: record.expiration,
        }
    }
}

/// Response body for PUT /items
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    /// Success message
    pub message: String,
    /// The path that was stored
    pub path: String,
    /// Expiration handed to the driver
    pub expiration: Timestamp,
}

impl StoreResponse {
    pub fn new(path: &KeyPath, expiration: Timestamp) -> Self {
        Self {
            message: format!("Path '{}' stored successfully", path),
            path: path.to_string(),
            expiration,
        }
    }
}

/// Response body for DELETE /items and DELETE /items/*path
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// The cleared subtree, `/` for the whole namespace
    pub path: String,
}

impl ClearResponse {
    pub fn new(path: &KeyPath) -> Self {
        Self {
            message: format!("Path '{}' cleared", path),
            path: path.to_string(),
        }
    }
}

/// Response body for POST /purge
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    pub message: String,
    pub driver: DriverKind,
}

impl PurgeResponse {
    pub fn new(driver: DriverKind) -> Self {
        Self {
            message: "Expired entries purged".to_string(),
            driver,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub failed_stores: u64,
    pub clears: u64,
    pub purges: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<&DriverStats> for StatsResponse {
    fn from(stats: &DriverStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            stores: stats.stores,
            failed_stores: stats.failed_stores,
            clears: stats.clears,
            purges: stats.purges,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Driver serving requests
    pub driver: DriverKind,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(driver: DriverKind) -> Self {
        Self {
            status: "healthy".to_string(),
            driver,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Availability of one driver kind on this host
#[derive(Debug, Clone, Serialize)]
pub struct DriverAvailability {
    pub kind: DriverKind,
    pub available: bool,
}

/// Response body for GET /drivers
#[derive(Debug, Clone, Serialize)]
pub struct DriversResponse {
    pub drivers: Vec<DriverAvailability>,
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
