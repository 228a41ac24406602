//! Submission and resolution engine.
//!
//! [`submitter::JobSubmitter`] validates and enqueues jobs;
//! [`resolver::StatusResolver`] derives the client-facing status of a
//! submitted job on every poll. Both are thin orchestration layers over
//! `scoring_core` and the substrate adapter in `scoring_db`.

pub mod resolver;
pub mod submitter;

pub use resolver::StatusResolver;
pub use submitter::JobSubmitter;
