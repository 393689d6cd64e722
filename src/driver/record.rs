//! Stored Record Module
//!
//! The value and caller expiration persisted by every driver.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::Timestamp;

// == Stored Record ==
/// A cached value with the expiration its caller asked for.
///
/// The expiration is the caller's original timestamp, not the capped
/// lifetime handed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The stored value
    pub data: Value,
    /// Expiration timestamp (Unix seconds)
    pub expiration: Timestamp,
}

impl StoredRecord {
    pub fn new(data: Value, expiration: Timestamp) -> Self {
        Self { data, expiration }
    }

    // == Validity ==
    /// A record is valid while `expiration > now`.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.expiration > now
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        !self.is_valid_at(now)
    }

    /// Seconds left before expiration, zero once expired.
    pub fn remaining(&self, now: Timestamp) -> u64 {
        self.expiration.saturating_sub(now).max(0) as u64
    }
}
