//! Handlers for the `/tasks` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use scoring_core::types::TaskId;
use scoring_db::models::task::{SubmitTask, TaskListQuery};
use scoring_db::repositories::TaskRepo;

use crate::engine::{JobSubmitter, StatusResolver};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks
///
/// Submit a new background job. Returns 201 with the canonical polling
/// shape (`status: pending`); `task_id` is the handle for the status
/// endpoint. The job starts `enqueued` and is picked up by whichever
/// worker fleet owns its queue.
pub async fn submit_task(
    State(state): State<AppState>,
    Json(input): Json<SubmitTask>,
) -> AppResult<impl IntoResponse> {
    let task = JobSubmitter::submit(&state.pool, &input).await?;
    let status = scoring_core::status::normalize(&task.id.to_string(), &task.status, None, None);
    Ok((StatusCode::CREATED, Json(status)))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks
///
/// List task records, newest first. Supports optional `status`, `queue`,
/// `limit`, and `offset` query parameters. Returns raw substrate records;
/// use the status endpoint for the normalized view of a single task.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskListQuery>,
) -> AppResult<impl IntoResponse> {
    let tasks = TaskRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: tasks }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks/{id}
///
/// Resolve the normalized status of one task. The response body is the
/// bare normalized status object, and the HTTP status follows it:
/// 200 for pending/running/completed/unknown, 500 for failed, 404 when
/// the substrate has no record of the handle.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> AppResult<impl IntoResponse> {
    let status = StatusResolver::resolve(&state.pool, task_id).await?;

    let http_status = StatusCode::from_u16(status.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((http_status, Json(status)))
}
