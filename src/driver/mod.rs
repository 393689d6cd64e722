//! Driver Module
//!
//! The uniform contract every cache backend implements, plus the shipped
//! backends and the key, expiration and scanning machinery they share.

mod composite;
mod expiration;
mod factory;
mod file;
mod key;
mod memory;
mod record;
mod scanner;
mod shared;
mod stats;


use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Re-export public types
pub use composite::CompositeDriver;
pub use expiration::{Clock, ExpirationPolicy, ManualClock, SystemClock, Timestamp};
pub use factory::{availability, build_driver};
pub use file::{FileDriver, RECORD_FILE};
pub use key::{hex_digest, install_prefix, KeyBuilder, KeyPath};
pub use memory::MemoryDriver;
pub use record::StoredRecord;
pub use scanner::{ChunkSource, InvalidationScanner};
pub use shared::{SharedMemoryDriver, SharedSegment, DEFAULT_SEGMENT_BYTES};
pub use stats::DriverStats;

// == Public Constants ==
/// Separator between storage key parts
pub const KEY_DELIMITER: &str = "::";

/// Default ceiling on entry lifetime in seconds
pub const DEFAULT_TTL: i64 = 300;

/// Default batch size for scan based operations
pub const DEFAULT_CHUNK_SIZE: usize = 100;

// == Driver ==
/// Synchronous contract shared by every cache backend.
///
/// A miss is `None`, a rejected write is `false`. Neither is an error.
pub trait Driver: Send + Sync {
    /// Returns the record stored under `path`, or `None` on a miss.
    ///
    /// Shipped drivers never return entries past their expiration.
    fn get_data(&self, path: &KeyPath) -> Option<StoredRecord>;

    /// Stores `data` under `path` until at most `min(ttl, expiration - now)`.
    ///
    /// An expiration that is not in the future stores nothing, drops any
    /// previous entry at `path` and returns `true`.
    fn store_data(&self, path: &KeyPath, data: Value, expiration: Timestamp) -> bool;

    /// Removes everything at or below `path`, or the whole namespace for `None`.
    ///
    /// Best effort: always `true` once the sweep completes.
    fn clear(&self, path: Option<&KeyPath>) -> bool;

    /// Removes entries whose expiration has passed.
    fn purge(&self) -> bool;

    fn kind(&self) -> DriverKind;

    /// Static capability probe, callable before construction.
    fn is_available() -> bool
    where
        Self: Sized;
}

// == Driver Kind ==
/// Identifies a backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Memory,
    Shared,
    File,
    Composite,
}

impl DriverKind {
    pub const ALL: [DriverKind; 4] = [
        DriverKind::Memory,
        DriverKind::Shared,
        DriverKind::File,
        DriverKind::Composite,
    ];

    /// Tag mixed into the install prefix of every key.
    pub fn tag(&self) -> &'static str {
        match self {
            DriverKind::Memory => "memory",
            DriverKind::Shared => "shared",
            DriverKind::File => "file",
            DriverKind::Composite => "composite",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "ephemeral" => Ok(DriverKind::Memory),
            "shared" | "apc" => Ok(DriverKind::Shared),
            "file" | "filesystem" => Ok(DriverKind::File),
            "composite" => Ok(DriverKind::Composite),
            other => Err(format!("unknown driver '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_kind_parse() {
        assert_eq!("memory".parse::<DriverKind>(), Ok(DriverKind::Memory));
        assert_eq!(" APC ".parse::<DriverKind>(), Ok(DriverKind::Shared));
        assert_eq!("filesystem".parse::<DriverKind>(), Ok(DriverKind::File));
        assert!("redis".parse::<DriverKind>().is_err());
    }

    #[test]
    fn test_driver_kind_tags_are_distinct() {
        let tags: std::collections::HashSet<_> = DriverKind::ALL.iter().map(|k| k.tag()).collect();
        assert_eq!(tags.len(), DriverKind::ALL.len());
    }
}
