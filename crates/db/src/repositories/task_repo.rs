//! Repository for the `tasks` table.
//!
//! Status literals come from `scoring_core::status`, no magic strings.
//! Submission is NOT idempotent: every `enqueue` creates a fresh row, and
//! no automatic retry exists anywhere (de-duplication is the caller's job).

use sqlx::PgPool;
use uuid::Uuid;

use scoring_core::status::{STATUS_DONE, STATUS_ENQUEUED, STATUS_FAILED, STATUS_RUNNING};
use scoring_core::types::TaskId;

use crate::models::task::{TaskListQuery, TaskRecord};

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, job_type, queue_name, status, args, result, error, \
    created_at, updated_at, started_at, completed_at";

/// Maximum page size for task listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for task listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides the substrate operations the platform consumes.
pub struct TaskRepo;

impl TaskRepo {
    /// Enqueue exactly one task message. Returns immediately with the row;
    /// the handle is usable for polling before any worker picks it up.
    pub async fn enqueue(
        pool: &PgPool,
        job_type: &str,
        queue_name: &str,
        args: &serde_json::Value,
    ) -> Result<TaskRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (id, job_type, queue_name, status, args) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(job_type)
            .bind(queue_name)
            .bind(STATUS_ENQUEUED)
            .bind(args)
            .fetch_one(pool)
            .await
    }

    /// Find a task by its handle.
    pub async fn find_by_id(
        pool: &PgPool,
        id: TaskId,
    ) -> Result<Option<TaskRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List tasks, newest first, with optional status/queue filters.
    pub async fn list(
        pool: &PgPool,
        params: &TaskListQuery,
    ) -> Result<Vec<TaskRecord>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if params.status.is_some() {
            conditions.push(format!("status = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.queue.is_some() {
            conditions.push(format!("queue_name = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, TaskRecord>(&query);

        if let Some(status) = &params.status {
            q = q.bind(status);
        }
        if let Some(queue) = &params.queue {
            q = q.bind(queue);
        }
        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }

    // -----------------------------------------------------------------------
    // Worker-side transitions
    // -----------------------------------------------------------------------

    /// Atomically claim the oldest enqueued task on one of the given
    /// queues and mark it running.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent worker processes
    /// never double-claim a message.
    pub async fn claim_next(
        pool: &PgPool,
        queues: &[&str],
    ) -> Result<Option<TaskRecord>, sqlx::Error> {
        let queues: Vec<String> = queues.iter().map(|q| q.to_string()).collect();
        let query = format!(
            "UPDATE tasks \
             SET status = $1, started_at = NOW(), updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM tasks \
                 WHERE queue_name = ANY($2) AND status = $3 \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskRecord>(&query)
            .bind(STATUS_RUNNING)
            .bind(&queues)
            .bind(STATUS_ENQUEUED)
            .fetch_optional(pool)
            .await
    }

    /// Mark a task done with its result payload.
    ///
    /// Terminal rows are left untouched: a task that already reached
    /// `done` or `failed` never transitions again.
    pub async fn complete(
        pool: &PgPool,
        id: TaskId,
        result: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks \
             SET status = $2, result = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status NOT IN ($4, $5)",
        )
        .bind(id)
        .bind(STATUS_DONE)
        .bind(result)
        .bind(STATUS_DONE)
        .bind(STATUS_FAILED)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a task failed with an error message. Never retried: failures
    /// are reported, and re-submission is the caller's decision.
    pub async fn fail(pool: &PgPool, id: TaskId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks \
             SET status = $2, error = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status NOT IN ($4, $5)",
        )
        .bind(id)
        .bind(STATUS_FAILED)
        .bind(error)
        .bind(STATUS_DONE)
        .bind(STATUS_FAILED)
        .execute(pool)
        .await?;
        Ok(())
    }
}
