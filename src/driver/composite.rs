//! Composite Driver Module
//!
//! Stacks drivers so a fast one can front a slower, larger one.

use serde_json::Value;
use tracing::debug;

use crate::driver::{Driver, DriverKind, KeyPath, StoredRecord, Timestamp};
use crate::error::{Result, StashError};

// == Composite Driver ==
/// Reads from the first driver holding a key, writes to all of them.
pub struct CompositeDriver {
    drivers: Vec<Box<dyn Driver>>,
}

impl CompositeDriver {
    // == Constructor ==
    /// Creates a composite over `drivers`, fastest first.
    pub fn new(drivers: Vec<Box<dyn Driver>>) -> Result<Self> {
        if drivers.is_empty() {
            return Err(StashError::Configuration(
                "composite driver needs at least one driver".to_string(),
            ));
        }
        Ok(Self { drivers })
    }

    pub fn drivers(&self) -> &[Box<dyn Driver>] {
        &self.drivers
    }
}

impl Driver for CompositeDriver {
    fn get_data(&self, path: &KeyPath) -> Option<StoredRecord> {
        self.drivers.iter().find_map(|driver| {
            let record = driver.get_data(path);
            if record.is_none() {
                debug!("composite: {} missed {}", driver.kind(), path);
            }
            record
        })
    }

    /// Writes slowest first so a fast layer never holds what a slow one lacks.
    fn store_data(&self, path: &KeyPath, data: Value, expiration: Timestamp) -> bool {
        self.drivers.iter().rev().fold(true, |stored, driver| {
            driver.store_data(path, data.clone(), expiration) && stored
        })
    }

    fn clear(&self, path: Option<&KeyPath>) -> bool {
        self.drivers
            .iter()
            .fold(true, |cleared, driver| driver.clear(path) && cleared)
    }

    fn purge(&self) -> bool {
        self.drivers
            .iter()
            .fold(true, |purged, driver| driver.purge() && purged)
    }

    fn kind(&self) -> DriverKind {
        DriverKind::Composite
    }

    fn is_available() -> bool {
        true
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverOptions;
    use crate::driver::{ManualClock, MemoryDriver};
    use serde_json::json;
    use std::sync::Arc;

    const START: Timestamp = 1_700_000_000;

    fn memory(namespace: &str, max_entries: usize, clock: &ManualClock) -> MemoryDriver {
        let options = DriverOptions::default()
            .with_namespace(namespace)
            .with_max_entries(max_entries);
        MemoryDriver::new(&options, Arc::new(clock.clone())).unwrap()
    }

    #[test]
    fn test_empty_composite_rejected() {
        assert!(matches!(
            CompositeDriver::new(Vec::new()),
            Err(StashError::Configuration(_))
        ));
    }

    #[test]
    fn test_store_reaches_every_layer() {
        let clock = ManualClock::new(START);
        let composite = CompositeDriver::new(vec![
            Box::new(memory("front", 10, &clock)),
            Box::new(memory("back", 10, &clock)),
        ])
        .unwrap();
        let path = KeyPath::new(["a"]);

        assert!(composite.store_data(&path, json!("v"), START + 100));
        for driver in composite.drivers() {
            assert_eq!(driver.get_data(&path).unwrap().data, json!("v"));
        }
    }

    #[test]
    fn test_get_falls_through_to_later_layer() {
        let clock = ManualClock::new(START);
        let composite = CompositeDriver::new(vec![
            Box::new(memory("front", 10, &clock)),
            Box::new(memory("back", 10, &clock)),
        ])
        .unwrap();
        let path = KeyPath::new(["a"]);

        composite.store_data(&path, json!("v"), START + 100);
        composite.drivers()[0].clear(None);

        assert_eq!(composite.get_data(&path).unwrap().data, json!("v"));
    }

    #[test]
    fn test_partial_store_failure_reported() {
        let clock = ManualClock::new(START);
        let full = memory("full", 0, &clock);
        let composite =
            CompositeDriver::new(vec![Box::new(full), Box::new(memory("back", 10, &clock))])
                .unwrap();
        let path = KeyPath::new(["a"]);

        assert!(!composite.store_data(&path, json!("v"), START + 100));
        // The healthy layer still took the write
        assert!(composite.get_data(&path).is_some());
    }
}
