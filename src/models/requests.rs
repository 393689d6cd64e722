//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::driver::{KeyPath, Timestamp, KEY_DELIMITER};

/// Request body for the store operation (PUT /items)
///
/// # Fields
/// - `path`: Key segments, outermost first
/// - `value`: The value to store
/// - `expiration`: Absolute expiration (Unix seconds)
/// - `ttl`: Relative lifetime in seconds, instead of `expiration`
#[derive(Debug, Clone, Deserialize)]
pub struct StoreRequest {
    pub path: Vec<String>,
    pub value: Value,
    #[serde(default)]
    pub expiration: Option<Timestamp>,
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl StoreRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.path.is_empty() {
            return Some("Path cannot be empty".to_string());
        }
        if self.path.iter().any(|segment| segment.contains(KEY_DELIMITER)) {
            return Some(format!("Path segments cannot contain '{}'", KEY_DELIMITER));
        }
        if self.expiration.is_some() && self.ttl.is_some() {
            return Some("Give either expiration or ttl, not both".to_string());
        }
        None
    }

    pub fn key_path(&self) -> KeyPath {
        KeyPath::new(self.path.iter().cloned())
    }

    /// Absolute expiration for this request.
    ///
    /// Falls back to `now + default_ttl` when neither field is set.
    pub fn resolve_expiration(&self, now: Timestamp, default_ttl: i64) -> Timestamp {
        match (self.expiration, self.ttl) {
            (Some(expiration), _) => expiration,
            (None, Some(ttl)) => now.saturating_add(ttl),
            (None, None) => now.saturating_add(default_ttl),
        }
    }
}
