//! Repositories wrapping all SQL against the task substrate.

pub mod task_repo;

pub use task_repo::TaskRepo;
