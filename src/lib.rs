//! Stash Drivers - pluggable cache backends
//!
//! One synchronous driver contract over memory, shared-segment, filesystem
//! and composite stores, with namespaced keys, TTL ceilings and
//! hierarchical invalidation.

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::{Config, DriverOptions};
pub use driver::{Driver, DriverKind, KeyPath, StoredRecord};
pub use error::{Result, StashError};
pub use tasks::spawn_purge_task;
