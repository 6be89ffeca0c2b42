//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: Purges expired assets at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
