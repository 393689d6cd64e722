//! Driver Factory Module
//!
//! Selects and constructs a backend by kind after probing its availability.

use std::sync::Arc;

use tracing::info;

use crate::config::DriverOptions;
use crate::driver::{
    Clock, CompositeDriver, Driver, DriverKind, FileDriver, MemoryDriver, SharedMemoryDriver,
};
use crate::error::{Result, StashError};

/// Static availability of `kind` on this host.
pub fn availability(kind: DriverKind) -> bool {
    match kind {
        DriverKind::Memory => MemoryDriver::is_available(),
        DriverKind::Shared => SharedMemoryDriver::is_available(),
        DriverKind::File => FileDriver::is_available(),
        DriverKind::Composite => {
            CompositeDriver::is_available()
                && MemoryDriver::is_available()
                && FileDriver::is_available()
        }
    }
}

// == Build Driver ==
/// Constructs the driver for `kind`.
///
/// `composite` stacks a memory driver over a file driver.
pub fn build_driver(
    kind: DriverKind,
    options: &DriverOptions,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn Driver>> {
    if !availability(kind) {
        return Err(StashError::Unavailable(kind.to_string()));
    }

    let driver: Box<dyn Driver> = match kind {
        DriverKind::Memory => Box::new(MemoryDriver::new(options, clock)?),
        DriverKind::Shared => Box::new(SharedMemoryDriver::new(options, clock)?),
        DriverKind::File => Box::new(FileDriver::new(options, clock)?),
        DriverKind::Composite => Box::new(CompositeDriver::new(vec![
            Box::new(MemoryDriver::new(options, clock.clone())?),
            Box::new(FileDriver::new(options, clock)?),
        ])?),
    };

    info!(
        "Constructed {} driver in namespace '{}'",
        kind,
        options.namespace()
    );
    Ok(driver)
}
