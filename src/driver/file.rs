//! File Driver Module
//!
//! Stores one JSON record per key in a directory tree mirroring the key
//! path: `root/<prefix>/<namespace>/<segment>/.../@record.json`. Clearing a
//! path removes its directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DriverOptions;
use crate::driver::{
    hex_digest, Clock, Driver, DriverKind, ExpirationPolicy, KeyBuilder, KeyPath, StoredRecord,
    Timestamp,
};
use crate::error::{Result, StashError};

/// Name of the record file inside a key directory
pub const RECORD_FILE: &str = "@record.json";

/// Longest key part kept readable in a directory name
const MAX_PLAIN_PART: usize = 64;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk record: the stored record plus its native deadline.
#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    data: Value,
    expiration: Timestamp,
    deadline: Timestamp,
}

impl FileRecord {
    fn is_live(&self, now: Timestamp) -> bool {
        self.deadline > now && self.expiration > now
    }
}

/// Encodes a key part as a directory name.
///
/// Short parts made of `[A-Za-z0-9_-]` stay readable behind a `k`; anything
/// else becomes `h` followed by its SHA-256.
pub fn encode_part(part: &str) -> String {
    let plain = part.len() <= MAX_PLAIN_PART
        && part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

    if plain {
        format!("k{}", part)
    } else {
        format!("h{}", hex_digest(part))
    }
}

// == File Driver ==
/// Filesystem driver with structural subtree deletion.
///
/// Reads check the native deadline and never return expired records.
pub struct FileDriver {
    keys: KeyBuilder,
    policy: ExpirationPolicy,
    clock: Arc<dyn Clock>,
    root: PathBuf,
}

impl FileDriver {
    // == Constructor ==
    /// Creates a driver rooted at `options.file_root`, creating the directory.
    pub fn new(options: &DriverOptions, clock: Arc<dyn Clock>) -> Result<Self> {
        options.validate()?;
        if !Self::is_available() {
            return Err(StashError::Unavailable(
                "no filesystem on this target".to_string(),
            ));
        }

        fs::create_dir_all(&options.file_root).map_err(|e| {
            StashError::Configuration(format!(
                "cannot create cache root {}: {}",
                options.file_root.display(),
                e
            ))
        })?;

        Ok(Self {
            keys: KeyBuilder::new(&options.install_id, DriverKind::File.tag(), options.namespace()),
            policy: ExpirationPolicy::new(options.ttl),
            clock,
            root: options.file_root.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the record for `path` and everything below it.
    pub fn dir_for(&self, path: &KeyPath) -> PathBuf {
        self.keys
            .components(path)
            .fold(self.root.clone(), |dir, part| dir.join(encode_part(part)))
    }

    fn record_file(&self, path: &KeyPath) -> PathBuf {
        self.dir_for(path).join(RECORD_FILE)
    }

    fn read_record(file: &Path) -> Option<FileRecord> {
        let bytes = match fs::read(file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("file: cannot read {}: {}", file.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("file: undecodable record {}: {}", file.display(), e);
                None
            }
        }
    }

    fn write_record(dir: &Path, record: &FileRecord) -> io::Result<()> {
        fs::create_dir_all(dir)?;

        let bytes = serde_json::to_vec(record)?;
        let temp = dir.join(format!(
            "{}.{}.{}.tmp",
            RECORD_FILE,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let mut file = fs::File::create(&temp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        // Atomic replace
        fs::rename(&temp, dir.join(RECORD_FILE)).inspect_err(|_| {
            let _ = fs::remove_file(&temp);
        })
    }

    fn remove_tree(dir: &Path) {
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("file: cannot remove {}: {}", dir.display(), e),
        }
    }

    /// Removes expired records below `dir`; returns whether `dir` is now empty.
    fn purge_dir(dir: &Path, now: Timestamp, removed: &mut usize) -> bool {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("file: cannot list {}: {}", dir.display(), e);
                }
                return false;
            }
        };

        let mut empty = true;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

            if is_dir {
                if Self::purge_dir(&path, now, removed) {
                    let _ = fs::remove_dir(&path);
                } else {
                    empty = false;
                }
                continue;
            }

            if entry.file_name() == RECORD_FILE {
                match Self::read_record(&path) {
                    Some(record) if !record.is_live(now) => {
                        if fs::remove_file(&path).is_ok() {
                            *removed += 1;
                            continue;
                        }
                    }
                    _ => {}
                }
            }
            empty = false;
        }
        empty
    }
}

impl Driver for FileDriver {
    fn get_data(&self, path: &KeyPath) -> Option<StoredRecord> {
        let now = self.clock.now();
        let record = Self::read_record(&self.record_file(path))?;

        if record.is_live(now) {
            Some(StoredRecord::new(record.data, record.expiration))
        } else {
            None
        }
    }

    fn store_data(&self, path: &KeyPath, data: Value, expiration: Timestamp) -> bool {
        let now = self.clock.now();

        let deadline = match self.policy.deadline(expiration, now) {
            Some(deadline) => deadline,
            None => {
                match fs::remove_file(self.record_file(path)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => warn!("file: cannot drop stale record for {}: {}", path, e),
                }
                return true;
            }
        };

        let record = FileRecord {
            data,
            expiration,
            deadline,
        };
        match Self::write_record(&self.dir_for(path), &record) {
            Ok(()) => true,
            Err(e) => {
                warn!("file: cannot store {}: {}", path, e);
                false
            }
        }
    }

    fn clear(&self, path: Option<&KeyPath>) -> bool {
        let root = KeyPath::root();
        let dir = self.dir_for(path.unwrap_or(&root));
        Self::remove_tree(&dir);
        debug!("file: cleared {}", dir.display());
        true
    }

    fn purge(&self) -> bool {
        let now = self.clock.now();
        let dir = self.dir_for(&KeyPath::root());

        let mut removed = 0usize;
        Self::purge_dir(&dir, now, &mut removed);
        debug!("file: purged {} expired records", removed);
        true
    }

    fn kind(&self) -> DriverKind {
        DriverKind::File
    }

    fn is_available() -> bool {
        !cfg!(target_family = "wasm")
    }
}
