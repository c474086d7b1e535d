//! Background Tasks Module
//!
//! Periodic maintenance tasks owned by the composition root.
//!
//! # Tasks
//! - TTL Cleanup: sweeps expired cache items at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
