//! Configuration Module
//!
//! Handles loading driver options and server settings from environment variables.

use std::env;
use std::path::PathBuf;

use crate::driver::{hex_digest, DriverKind, DEFAULT_CHUNK_SIZE, DEFAULT_TTL, KEY_DELIMITER};
use crate::error::{Result, StashError};

/// Install id used when none is configured.
pub const DEFAULT_INSTALL_ID: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

/// Options recognized by every driver constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverOptions {
    /// Ceiling on stored-entry lifetime in seconds
    pub ttl: i64,
    /// Explicit namespace; derived from the install id when unset
    pub namespace: Option<String>,
    /// Batch size for scan based operations
    pub chunk_size: usize,
    /// Deployment identifier mixed into every storage key
    pub install_id: String,
    /// Entry cap for the memory driver
    pub max_entries: usize,
    /// Root directory for the file driver
    pub file_root: PathBuf,
}

impl DriverOptions {
    // == Namespace ==
    /// The configured namespace, or a digest of the install id.
    pub fn namespace(&self) -> String {
        match &self.namespace {
            Some(namespace) => namespace.clone(),
            None => hex_digest(&self.install_id)[..32].to_string(),
        }
    }

    // == Validate ==
    /// Rejects options no driver can run with.
    pub fn validate(&self) -> Result<()> {
        if self.ttl <= 0 {
            return Err(StashError::Configuration(format!(
                "ttl must be positive, got {}",
                self.ttl
            )));
        }
        if self.chunk_size == 0 {
            return Err(StashError::Configuration(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.install_id.is_empty() {
            return Err(StashError::Configuration(
                "install id cannot be empty".to_string(),
            ));
        }
        if let Some(namespace) = &self.namespace {
            if namespace.is_empty() {
                return Err(StashError::Configuration(
                    "namespace cannot be empty".to_string(),
                ));
            }
            if namespace.contains(KEY_DELIMITER) {
                return Err(StashError::Configuration(format!(
                    "namespace '{}' contains the key delimiter '{}'",
                    namespace, KEY_DELIMITER
                )));
            }
        }
        Ok(())
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_file_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.file_root = root.into();
        self
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            namespace: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            install_id: DEFAULT_INSTALL_ID.to_string(),
            max_entries: 10_000,
            file_root: env::temp_dir().join("stash_drivers"),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend served by the HTTP surface
    pub driver: DriverKind,
    /// Options handed to the driver constructor
    pub options: DriverOptions,
    /// HTTP server port
    pub server_port: u16,
    /// Background purge interval in seconds
    pub purge_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STASH_DRIVER` - memory, shared, file or composite (default: memory)
    /// - `STASH_TTL` - Lifetime ceiling in seconds (default: 300)
    /// - `STASH_NAMESPACE` - Key namespace (default: derived from install id)
    /// - `STASH_CHUNK_SIZE` - Scan batch size (default: 100)
    /// - `STASH_INSTALL_ID` - Deployment identifier (default: crate name and version)
    /// - `STASH_MAX_ENTRIES` - Memory driver capacity (default: 10000)
    /// - `STASH_FILE_ROOT` - File driver root (default: `<tmp>/stash_drivers`)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `PURGE_INTERVAL` - Purge frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = DriverOptions::default();

        let options = DriverOptions {
            ttl: parsed("STASH_TTL").unwrap_or(defaults.ttl),
            namespace: env::var("STASH_NAMESPACE").ok().filter(|v| !v.is_empty()),
            chunk_size: parsed("STASH_CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            install_id: env::var("STASH_INSTALL_ID")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.install_id),
            max_entries: parsed("STASH_MAX_ENTRIES").unwrap_or(defaults.max_entries),
            file_root: env::var("STASH_FILE_ROOT")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.file_root),
        };

        Self {
            driver: parsed("STASH_DRIVER").unwrap_or(DriverKind::Memory),
            options,
            server_port: parsed("SERVER_PORT").unwrap_or(3000),
            purge_interval: parsed("PURGE_INTERVAL").unwrap_or(60),
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: DriverKind::Memory,
            options: DriverOptions::default(),
            server_port: 3000,
            purge_interval: 60,
        }
    }
}
