//! Transfer outcome model and bucket key derivation.
//!
//! A transfer moves a dataset (one streamed object or a staged multi-file
//! archive) into the destination bucket. The outcome is built incrementally
//! as upload workers finish and is immutable once returned: partial success
//! is reported as such, never collapsed into a single boolean.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::DbId;

/// Result of one file's upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTransfer {
    Ok,
    Failed(String),
}

impl Serialize for FileTransfer {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FileTransfer::Ok => serializer.serialize_str("ok"),
            FileTransfer::Failed(err) => serializer.serialize_str(err),
        }
    }
}

/// Aggregated outcome of one `move_dataset` invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// The destination already held the dataset key; no transfer was
    /// attempted. This is the idempotence guard for retried submissions.
    pub already_exists: bool,
    /// Per-file results keyed by file name, in stable order.
    pub per_file: BTreeMap<String, FileTransfer>,
}

impl TransferOutcome {
    /// Outcome for the short-circuit case: the dataset key already exists.
    pub fn existing() -> Self {
        TransferOutcome {
            already_exists: true,
            ..TransferOutcome::default()
        }
    }

    /// Record one successful upload.
    pub fn record_ok(&mut self, file_name: impl Into<String>) {
        self.succeeded += 1;
        self.per_file.insert(file_name.into(), FileTransfer::Ok);
    }

    /// Record one failed upload. The failure stays local to this file.
    pub fn record_err(&mut self, file_name: impl Into<String>, error: impl Into<String>) {
        self.failed += 1;
        self.per_file
            .insert(file_name.into(), FileTransfer::Failed(error.into()));
    }

    /// Overall success: at least one file landed, or the dataset was
    /// already present. Callers needing detail must inspect `per_file`.
    pub fn ok(&self) -> bool {
        self.already_exists || self.succeeded > 0
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Build the structured result payload the upload worker persists and
    /// the status resolver later decodes.
    pub fn to_report(
        &self,
        dataset_id: DbId,
        dataset_name: &str,
        bucket_name: &str,
    ) -> Value {
        let message = if self.already_exists {
            format!("dataset '{dataset_name}' already exists in bucket '{bucket_name}'")
        } else if self.ok() {
            format!(
                "uploaded {} of {} files to bucket '{bucket_name}'",
                self.succeeded,
                self.total()
            )
        } else {
            format!("upload of dataset '{dataset_name}' failed: no file landed")
        };

        json!({
            "error": !self.ok(),
            "message": message,
            "already_exists": self.already_exists,
            "dataset_id": dataset_id,
            "dataset_name": dataset_name,
            "bucket_name": bucket_name,
            "results": {
                "succeeded": self.succeeded,
                "failed": self.failed,
                "per_file": self.per_file,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// Destination key for one staged file: `{dataset}/{basename}`.
pub fn destination_key(dataset_name: &str, file_name: &str) -> String {
    format!("{}/{}", trim_key(dataset_name), file_name)
}

/// Destination key for a directly streamed single-object dataset.
pub fn direct_key(dataset_name: &str) -> String {
    trim_key(dataset_name).to_string()
}

/// Key prefix under which an archive's files land, with trailing slash,
/// used for the existence probe.
pub fn dataset_prefix(dataset_name: &str) -> String {
    format!("{}/", trim_key(dataset_name))
}

fn trim_key(name: &str) -> &str {
    name.trim().trim_matches('/')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- outcome accounting ----------------------------------------------------

    #[test]
    fn counts_add_up() {
        let mut outcome = TransferOutcome::default();
        outcome.record_ok("a.parquet");
        outcome.record_err("b.parquet", "connection reset");
        outcome.record_ok("c.parquet");

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.per_file.len(), 3);
        assert!(outcome.ok());
    }

    #[test]
    fn all_failed_is_not_ok() {
        let mut outcome = TransferOutcome::default();
        outcome.record_err("a", "boom");
        assert!(!outcome.ok());
    }

    #[test]
    fn already_exists_is_ok_with_zero_transfers() {
        let outcome = TransferOutcome::existing();
        assert!(outcome.ok());
        assert_eq!(outcome.total(), 0);
        assert!(outcome.already_exists);
    }

    #[test]
    fn per_file_preserves_error_strings() {
        let mut outcome = TransferOutcome::default();
        outcome.record_ok("f1");
        outcome.record_err("f2", "timeout talking to bucket");
        outcome.record_ok("f3");

        assert_eq!(outcome.per_file["f1"], FileTransfer::Ok);
        assert_eq!(
            outcome.per_file["f2"],
            FileTransfer::Failed("timeout talking to bucket".to_string())
        );
        assert_eq!(outcome.per_file["f3"], FileTransfer::Ok);
    }

    // -- report payload --------------------------------------------------------

    #[test]
    fn report_marks_success() {
        let mut outcome = TransferOutcome::default();
        outcome.record_ok("train.parquet");
        let report = outcome.to_report(3, "home-credit", "mlflow");

        assert_eq!(report["error"], false);
        assert_eq!(report["dataset_id"], 3);
        assert_eq!(report["dataset_name"], "home-credit");
        assert_eq!(report["bucket_name"], "mlflow");
        assert_eq!(report["results"]["succeeded"], 1);
        assert_eq!(report["results"]["per_file"]["train.parquet"], "ok");
    }

    #[test]
    fn report_marks_total_failure_as_error() {
        let mut outcome = TransferOutcome::default();
        outcome.record_err("train.parquet", "access denied");
        let report = outcome.to_report(3, "home-credit", "mlflow");

        assert_eq!(report["error"], true);
        assert_eq!(
            report["results"]["per_file"]["train.parquet"],
            "access denied"
        );
    }

    #[test]
    fn report_for_existing_dataset() {
        let report = TransferOutcome::existing().to_report(3, "home-credit", "mlflow");
        assert_eq!(report["error"], false);
        assert_eq!(report["already_exists"], true);
        assert_eq!(report["results"]["succeeded"], 0);
    }

    // -- key derivation --------------------------------------------------------

    #[test]
    fn staged_file_keys() {
        assert_eq!(
            destination_key("home-credit", "train.parquet"),
            "home-credit/train.parquet"
        );
    }

    #[test]
    fn keys_are_trimmed() {
        assert_eq!(destination_key(" home-credit/ ", "x"), "home-credit/x");
        assert_eq!(direct_key("/home-credit/"), "home-credit");
        assert_eq!(dataset_prefix("home-credit"), "home-credit/");
    }
}
