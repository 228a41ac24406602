//! Request handlers, grouped by resource.

pub mod buckets;
pub mod tasks;
