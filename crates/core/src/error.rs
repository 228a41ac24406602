use crate::types::DbId;

/// Domain error taxonomy shared by every crate in the workspace.
///
/// Per-file transfer failures are deliberately NOT represented here: they
/// are recovered locally by the mover (logged, counted, the staged file is
/// kept for manual recovery) and never escalate. Only whole-operation
/// failures become a `CoreError`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The queue substrate rejected an enqueue (connectivity, validation).
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// A required configuration value (e.g. destination bucket) is unset.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Permission or credential failure against an external system.
    #[error("Access denied: {0}")]
    Access(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A whole-transfer failure (bulk fetch, staging I/O). Individual file
    /// upload failures are reported through `TransferOutcome` instead.
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// The substrate reported a status outside the known vocabulary.
    #[error("Unrecognized task status: {0}")]
    UnknownStatus(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
