use scoring_core::error::CoreError;

/// Failure of a single storage or fetch operation.
///
/// Inside the mover's fan-out phase these stay per-file (logged and
/// counted); everywhere else they convert into [`CoreError::Transfer`]
/// and abort the operation.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The bucket rejected an operation (transport, auth, missing key).
    #[error("bucket operation failed: {0}")]
    Bucket(String),

    /// Fetching from the external source failed.
    #[error("source fetch failed: {0}")]
    Fetch(String),

    /// Local staging I/O failed.
    #[error("staging I/O failed: {0}")]
    Staging(String),

    /// The downloaded archive could not be unpacked.
    #[error("archive unpack failed: {0}")]
    Archive(String),
}

impl From<TransferError> for CoreError {
    fn from(err: TransferError) -> Self {
        CoreError::Transfer(err.to_string())
    }
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        TransferError::Staging(err.to_string())
    }
}
