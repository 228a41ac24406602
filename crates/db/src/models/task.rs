//! Task entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use scoring_core::types::{TaskId, Timestamp};

/// A row from the `tasks` table.
///
/// The row is owned by the queue substrate: the submitter inserts it, the
/// worker fleet drives `status` to a terminal value, and everything else
/// reads it. Once `status` is `done` or `failed` it never changes again.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub job_type: String,
    pub queue_name: String,
    /// Raw substrate status string; normalized by `scoring_core::status`.
    pub status: String,
    pub args: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// DTO for submitting a new task via `POST /api/v1/tasks`.
#[derive(Debug, Deserialize)]
pub struct SubmitTask {
    /// Wire name of the job type (e.g. `audit`, `upload`).
    pub job_type: String,
    /// Raw arguments, decoded and validated against the job type's shape
    /// before anything is enqueued.
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Query parameters for `GET /api/v1/tasks`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    /// Filter by raw substrate status (e.g. `enqueued`, `running`).
    pub status: Option<String>,
    /// Filter by queue name.
    pub queue: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
