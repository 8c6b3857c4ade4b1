//! Background Tasks Module
//!
//! Long-running tasks spawned next to the repositories.
//!
//! # Tasks
//! - TTL Cleanup: sweeps expired cache entries at a fixed interval
//! - Write-Behind Flush: persists buffered writes on an interval or when the
//!   pending set crosses its threshold

mod cleanup;
mod flush;

pub use cleanup::spawn_cleanup_task;
pub use flush::spawn_flush_task;
