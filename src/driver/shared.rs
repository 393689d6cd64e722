//! Shared Memory Driver Module
//!
//! A process-wide segment of byte blobs with native deadlines, and the
//! driver that stores serialized records in it. The segment can only list
//! keys by prefix a chunk at a time, so clear and purge run through
//! [`InvalidationScanner`](crate::driver::InvalidationScanner).

use std::collections::BTreeMap;
use std::env;
use std::ops::Bound;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DriverOptions;
use crate::driver::{
    ChunkSource, Clock, Driver, DriverKind, ExpirationPolicy, InvalidationScanner, KeyBuilder,
    KeyPath, StoredRecord, Timestamp,
};
use crate::error::{Result, StashError};

/// Default segment size in bytes
pub const DEFAULT_SEGMENT_BYTES: usize = 32 * 1024 * 1024;

/// Environment switch that disables the shared segment.
pub const SEGMENT_SWITCH: &str = "STASH_SHARED_SEGMENT";

static GLOBAL_SEGMENT: Lazy<Arc<SharedSegment>> =
    Lazy::new(|| Arc::new(SharedSegment::new(DEFAULT_SEGMENT_BYTES)));

// == Shared Segment ==
#[derive(Debug, Clone)]
struct SegmentEntry {
    bytes: Vec<u8>,
    deadline: Timestamp,
}

#[derive(Debug, Default)]
struct SegmentState {
    entries: BTreeMap<String, SegmentEntry>,
    used_bytes: usize,
}

impl SegmentState {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.used_bytes -= key.len() + entry.bytes.len();
                true
            }
            None => false,
        }
    }

    fn reap(&mut self, now: Timestamp) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }
}

/// Flat key/value memory shared by every driver in the process.
///
/// Offers fetch, store, delete and chunked prefix listing. Nothing more.
#[derive(Debug)]
pub struct SharedSegment {
    capacity_bytes: usize,
    state: RwLock<SegmentState>,
}

impl SharedSegment {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            state: RwLock::new(SegmentState::default()),
        }
    }

    /// The process-wide segment.
    pub fn global() -> Arc<SharedSegment> {
        GLOBAL_SEGMENT.clone()
    }

    /// Whether the segment is enabled on this host.
    pub fn enabled() -> bool {
        match env::var(SEGMENT_SWITCH) {
            Ok(value) => !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "off" | "0" | "false"
            ),
            Err(_) => true,
        }
    }

    // == Fetch ==
    /// Returns the blob under `key` unless its deadline has passed.
    pub fn fetch(&self, key: &str, now: Timestamp) -> Option<Vec<u8>> {
        let state = self.state.read();
        state
            .entries
            .get(key)
            .filter(|entry| entry.deadline > now)
            .map(|entry| entry.bytes.clone())
    }

    // == Store ==
    /// Stores `bytes` under `key` for `life` seconds.
    ///
    /// Fails when the segment is full even after reaping expired entries.
    pub fn store(&self, key: &str, bytes: Vec<u8>, life: u64, now: Timestamp) -> bool {
        let size = key.len() + bytes.len();
        let mut state = self.state.write();

        let replaced = state
            .entries
            .get(key)
            .map_or(0, |entry| key.len() + entry.bytes.len());

        if state.used_bytes - replaced + size > self.capacity_bytes {
            let reaped = state.reap(now);
            debug!("shared segment: reaped {} expired entries", reaped);
        }

        let replaced = state
            .entries
            .get(key)
            .map_or(0, |entry| key.len() + entry.bytes.len());
        if state.used_bytes - replaced + size > self.capacity_bytes {
            return false;
        }

        state.remove(key);
        state.used_bytes += size;
        state.entries.insert(
            key.to_string(),
            SegmentEntry {
                bytes,
                deadline: now.saturating_add(life as i64),
            },
        );
        true
    }

    /// Native deadline of the entry under `key`, live or not.
    pub fn deadline(&self, key: &str) -> Option<Timestamp> {
        self.state.read().entries.get(key).map(|entry| entry.deadline)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.state.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_bytes(&self) -> usize {
        self.state.read().used_bytes
    }
}

impl ChunkSource for SharedSegment {
    fn next_chunk(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Vec<(String, Vec<u8>)> {
        let state = self.state.read();
        let lower = match after {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Included(prefix.to_string()),
        };

        state
            .entries
            .range((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, entry)| (key.clone(), entry.bytes.clone()))
            .collect()
    }
}

// == Shared Memory Driver ==
/// Driver storing JSON encoded records in a [`SharedSegment`].
///
/// Reads never return entries past the segment deadline. Drivers sharing a
/// segment are isolated by their key prefix and namespace.
pub struct SharedMemoryDriver {
    keys: KeyBuilder,
    policy: ExpirationPolicy,
    chunk_size: usize,
    clock: Arc<dyn Clock>,
    segment: Arc<SharedSegment>,
}

impl SharedMemoryDriver {
    // == Constructor ==
    /// Creates a driver on the process-wide segment.
    pub fn new(options: &DriverOptions, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_segment(options, clock, SharedSegment::global())
    }

    pub fn with_segment(
        options: &DriverOptions,
        clock: Arc<dyn Clock>,
        segment: Arc<SharedSegment>,
    ) -> Result<Self> {
        options.validate()?;
        if !Self::is_available() {
            return Err(StashError::Unavailable(format!(
                "shared segment disabled by {}",
                SEGMENT_SWITCH
            )));
        }

        Ok(Self {
            keys: KeyBuilder::new(&options.install_id, DriverKind::Shared.tag(), options.namespace()),
            policy: ExpirationPolicy::new(options.ttl),
            chunk_size: options.chunk_size,
            clock,
            segment,
        })
    }

    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    pub fn segment(&self) -> &Arc<SharedSegment> {
        &self.segment
    }
}

impl Driver for SharedMemoryDriver {
    fn get_data(&self, path: &KeyPath) -> Option<StoredRecord> {
        let now = self.clock.now();
        let bytes = self.segment.fetch(&self.keys.build(path), now)?;

        match serde_json::from_slice::<StoredRecord>(&bytes) {
            Ok(record) if record.is_valid_at(now) => Some(record),
            Ok(_) => None,
            Err(e) => {
                debug!("shared: undecodable entry at {}: {}", path, e);
                None
            }
        }
    }

    fn store_data(&self, path: &KeyPath, data: Value, expiration: Timestamp) -> bool {
        let now = self.clock.now();
        let key = self.keys.build(path);

        let life = match self.policy.lifetime(expiration, now) {
            Some(life) => life,
            None => {
                self.segment.delete(&key);
                return true;
            }
        };

        let bytes = match serde_json::to_vec(&StoredRecord::new(data, expiration)) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("shared: cannot encode record for {}: {}", path, e);
                return false;
            }
        };

        let stored = self.segment.store(&key, bytes, life, now);
        if !stored {
            warn!("shared: segment full, rejecting {}", path);
        }
        stored
    }

    fn clear(&self, path: Option<&KeyPath>) -> bool {
        let root = KeyPath::root();
        let prefix = self.keys.prefix_of(path.unwrap_or(&root));

        let mut removed = 0usize;
        let scanner =
            InvalidationScanner::new(self.segment.as_ref(), prefix.as_str(), self.chunk_size);
        for (key, _) in scanner {
            if self.segment.delete(&key) {
                removed += 1;
            }
        }
        debug!("shared: cleared {} entries under {}", removed, prefix);
        true
    }

    fn purge(&self) -> bool {
        let now = self.clock.now();
        let prefix = self.keys.prefix_of(&KeyPath::root());

        let mut removed = 0usize;
        let mut skipped = 0usize;
        let scanner =
            InvalidationScanner::new(self.segment.as_ref(), prefix.as_str(), self.chunk_size);
        for (key, bytes) in scanner {
            // Past its native deadline the entry is dead whatever it holds.
            let past_deadline = self
                .segment
                .deadline(&key)
                .is_some_and(|deadline| deadline <= now);

            let expired = past_deadline
                || match serde_json::from_slice::<StoredRecord>(&bytes) {
                    Ok(record) => record.is_expired_at(now),
                    Err(_) => {
                        skipped += 1;
                        continue;
                    }
                };
            if expired && self.segment.delete(&key) {
                removed += 1;
            }
        }
        debug!(
            "shared: purged {} expired entries, skipped {} undecodable",
            removed, skipped
        );
        true
    }

    fn kind(&self) -> DriverKind {
        DriverKind::Shared
    }

    fn is_available() -> bool {
        SharedSegment::enabled()
    }
}
