//! Driver Statistics Module
//!
//! Tracks outcomes of driver operations: hits, misses, stores, clears, purges.

use serde::Serialize;

// == Driver Stats ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriverStats {
    /// Reads that returned a record
    pub hits: u64,
    /// Reads that returned nothing
    pub misses: u64,
    /// Writes the backend accepted
    pub stores: u64,
    /// Writes the backend rejected
    pub failed_stores: u64,
    /// Clear calls, scoped or whole-namespace
    pub clears: u64,
    /// Purge sweeps
    pub purges: u64,
}

impl DriverStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_read(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn record_store(&mut self, stored: bool) {
        if stored {
            self.stores += 1;
        } else {
            self.failed_stores += 1;
        }
    }

    pub fn record_clear(&mut self) {
        self.clears += 1;
    }

    pub fn record_purge(&mut self) {
        self.purges += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = DriverStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.stores, 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = DriverStats::new();
        stats.record_read(true);
        stats.record_read(false);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_store_outcomes() {
        let mut stats = DriverStats::new();
        stats.record_store(true);
        stats.record_store(true);
        stats.record_store(false);
        assert_eq!(stats.stores, 2);
        assert_eq!(stats.failed_stores, 1);
    }

    #[test]
    fn test_clear_and_purge_counters() {
        let mut stats = DriverStats::new();
        stats.record_clear();
        stats.record_purge();
        stats.record_purge();
        assert_eq!(stats.clears, 1);
        assert_eq!(stats.purges, 2);
    }
}
