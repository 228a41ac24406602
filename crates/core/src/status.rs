//! Task status normalization.
//!
//! The queue substrate persists a raw status string and a polymorphic
//! result payload (a structured record, an arbitrary report, or a
//! serialized exception). This module derives the client-facing status
//! from those two values. The derivation is pure: nothing here is stored,
//! and callers may re-run it on every poll.
//!
//! Derivation table:
//!
//! ```text
//! raw enqueued/delayed          -> pending
//! raw running                   -> running
//! raw done, result absent       -> completed (warning payload)
//! raw done, payload error set   -> failed (application-level error)
//! raw done, payload ok          -> completed with the payload
//! raw done, non-record payload  -> failed (serialized exception)
//! raw failed                    -> failed (substrate-level error)
//! record not found              -> failed, not-found variant
//! anything else                 -> unknown
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Raw substrate status
// ---------------------------------------------------------------------------

/// Raw status as enqueued workers persist it.
pub const STATUS_ENQUEUED: &str = "enqueued";
/// Raw status for a message scheduled with a delay.
pub const STATUS_DELAYED: &str = "delayed";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_DONE: &str = "done";
pub const STATUS_FAILED: &str = "failed";

/// The substrate's status vocabulary. Terminal statuses (`Done`, `Failed`)
/// never transition again; the vocabulary is open-ended on the wire, so
/// unrecognized values are carried through rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStatus {
    Enqueued,
    Delayed,
    Running,
    Done,
    Failed,
    Unknown(String),
}

impl RawStatus {
    /// Parse a raw status string. Never fails: out-of-vocabulary values
    /// become [`RawStatus::Unknown`] and surface as an `unknown` status.
    pub fn parse(raw: &str) -> Self {
        match raw {
            STATUS_ENQUEUED => RawStatus::Enqueued,
            STATUS_DELAYED => RawStatus::Delayed,
            STATUS_RUNNING => RawStatus::Running,
            STATUS_DONE => RawStatus::Done,
            STATUS_FAILED => RawStatus::Failed,
            other => RawStatus::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RawStatus::Done | RawStatus::Failed)
    }
}

// ---------------------------------------------------------------------------
// Result payload decoding
// ---------------------------------------------------------------------------

/// The `error` entry of a structured result record. Workers have written
/// both a boolean flag and a bare error string historically; both mean the
/// job body failed at the application level.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ErrorFlag {
    Flag(bool),
    Detail(String),
}

impl ErrorFlag {
    /// Whether the flag marks an application-level failure.
    pub fn is_error(&self) -> bool {
        match self {
            ErrorFlag::Flag(b) => *b,
            ErrorFlag::Detail(s) => !s.is_empty(),
        }
    }

    /// Human-readable failure detail, if the flag carries one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ErrorFlag::Detail(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Structured result record written by well-behaved workers.
///
/// Arbitrary report objects (e.g. a raw audit report) also decode into
/// this shape: every field is optional and unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
}

/// A `done` job's result payload, decoded into an explicit sum type at the
/// substrate boundary instead of being duck-typed downstream.
#[derive(Debug, Clone)]
pub enum ResultPayload {
    /// A structured (or at least object-shaped) report.
    Report(TaskReport),
    /// Anything that is not an object, typically an exception serialized
    /// by the worker runtime. The string representation is the error.
    Exception(String),
}

impl ResultPayload {
    /// Decode a raw result value immediately after retrieval.
    pub fn decode(value: &Value) -> Self {
        match value {
            Value::Object(_) => match serde_json::from_value::<TaskReport>(value.clone()) {
                Ok(report) => ResultPayload::Report(report),
                // An object whose `error` entry has an unexpected shape.
                Err(_) => ResultPayload::Exception(value.to_string()),
            },
            Value::String(s) => ResultPayload::Exception(s.clone()),
            other => ResultPayload::Exception(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized status
// ---------------------------------------------------------------------------

/// Client-facing status taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Pending,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Pending => "pending",
            StatusKind::Running => "running",
            StatusKind::Completed => "completed",
            StatusKind::Failed => "failed",
            StatusKind::Unknown => "unknown",
        }
    }

    /// Polling clients stop at a terminal normalized status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatusKind::Completed | StatusKind::Failed | StatusKind::Unknown
        )
    }
}

/// The canonical polling response shape: `{status, message, task_id,
/// result?, error?}`. Derived, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedStatus {
    pub status: StatusKind,
    pub message: String,
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Distinguishes "job failed" (500) from "no such job" (404).
    #[serde(skip)]
    pub not_found: bool,
}

impl NormalizedStatus {
    /// HTTP status code mapping: pending/running/completed/unknown map to
    /// 200, failed to 500, and the not-found variant to 404.
    pub fn http_status(&self) -> u16 {
        if self.not_found {
            404
        } else if self.status == StatusKind::Failed {
            500
        } else {
            200
        }
    }
}

/// Derive the normalized status from a substrate record's fields.
///
/// `raw_status`, `result`, and `error` are the record columns as stored;
/// the function is total and never fails.
pub fn normalize(
    task_id: &str,
    raw_status: &str,
    result: Option<&Value>,
    error: Option<&str>,
) -> NormalizedStatus {
    let base = |status: StatusKind, message: String| NormalizedStatus {
        status,
        message,
        task_id: task_id.to_string(),
        result: None,
        error: None,
        not_found: false,
    };

    match RawStatus::parse(raw_status) {
        RawStatus::Enqueued | RawStatus::Delayed => base(
            StatusKind::Pending,
            "task is waiting to be processed".to_string(),
        ),
        RawStatus::Running => base(StatusKind::Running, "task is running".to_string()),
        RawStatus::Failed => {
            let mut s = base(StatusKind::Failed, "task failed".to_string());
            s.error = Some(
                error
                    .filter(|e| !e.is_empty())
                    .unwrap_or("no error detail recorded")
                    .to_string(),
            );
            s
        }
        RawStatus::Done => normalize_done(task_id, result),
        RawStatus::Unknown(value) => base(
            StatusKind::Unknown,
            format!("unrecognized status: {value}"),
        ),
    }
}

/// Normalized status for a handle the substrate has no record of.
/// Reported as a failure, never as a transport error or a panic.
pub fn not_found(task_id: &str) -> NormalizedStatus {
    NormalizedStatus {
        status: StatusKind::Failed,
        message: "task not found".to_string(),
        task_id: task_id.to_string(),
        result: None,
        error: Some("task not found".to_string()),
        not_found: true,
    }
}

/// Inspect a `done` record's payload.
///
/// A `done` job whose payload encodes an application-level error is
/// reported as `failed`: the substrate-level success and the payload-level
/// failure are two distinct causes and both survive normalization.
fn normalize_done(task_id: &str, result: Option<&Value>) -> NormalizedStatus {
    let Some(value) = result else {
        // A done job without a result is completed with a warning, not
        // failed.
        return NormalizedStatus {
            status: StatusKind::Completed,
            message: "task completed but no result is available".to_string(),
            task_id: task_id.to_string(),
            result: Some(json!({ "warning": "task produced no result payload" })),
            error: None,
            not_found: false,
        };
    };

    match ResultPayload::decode(value) {
        ResultPayload::Report(report) => {
            let app_error = report.error.as_ref().filter(|f| f.is_error());
            match app_error {
                Some(flag) => {
                    let detail = flag
                        .detail()
                        .or(report.message.as_deref())
                        .unwrap_or("task reported an error without detail")
                        .to_string();
                    NormalizedStatus {
                        status: StatusKind::Failed,
                        message: "task completed with errors".to_string(),
                        task_id: task_id.to_string(),
                        result: Some(value.clone()),
                        error: Some(detail),
                        not_found: false,
                    }
                }
                None => NormalizedStatus {
                    status: StatusKind::Completed,
                    message: "task completed successfully".to_string(),
                    task_id: task_id.to_string(),
                    result: Some(value.clone()),
                    error: None,
                    not_found: false,
                },
            }
        }
        ResultPayload::Exception(repr) => NormalizedStatus {
            status: StatusKind::Failed,
            message: "task completed with an exception".to_string(),
            task_id: task_id.to_string(),
            result: Some(json!({ "exception": repr })),
            error: Some(repr),
            not_found: false,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
