//! Worker binary library: claims and executes upload and template jobs.
//!
//! The ML queues (`train`, `predict`, `audit`, `analyse`) are consumed by
//! the external training fleet; this worker owns only the queues whose
//! job bodies live in this workspace.

pub mod executor;

pub use executor::{JobRunner, TaskExecutor, OWNED_QUEUES};
