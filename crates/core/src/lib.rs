//! Pure domain logic for the scoring platform backend.
//!
//! Everything in this crate is side-effect free: job type definitions and
//! argument validation, the task status normalization state machine, the
//! transfer outcome model, and template rendering. No database, network, or
//! filesystem access; those live in `scoring-db`, `scoring-storage`, and
//! the service crates.

pub mod error;
pub mod job;
pub mod status;
pub mod template;
pub mod transfer;
pub mod types;
