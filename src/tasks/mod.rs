//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Purge: sweeps expired entries out of the driver at configured intervals

mod purge;

pub use purge::spawn_purge_task;
