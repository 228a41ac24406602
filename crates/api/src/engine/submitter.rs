//! Job submission: decode, validate, enqueue.

use scoring_core::error::CoreError;
use scoring_core::job::{JobArgs, JobType};
use scoring_db::models::task::{SubmitTask, TaskRecord};
use scoring_db::repositories::TaskRepo;
use scoring_db::DbPool;

/// Validates submissions and hands them to the queue substrate.
///
/// Submission is fire-and-forget: the returned record is a handle for
/// polling, and the submitter never waits for a worker to pick the job
/// up. It is also NOT idempotent; submitting twice enqueues twice.
pub struct JobSubmitter;

impl JobSubmitter {
    /// Decode, validate, and enqueue one job. Returns the created task
    /// record immediately.
    ///
    /// Validation failures reject the submission before anything is
    /// written; enqueue failures surface as [`CoreError::Dispatch`].
    pub async fn submit(pool: &DbPool, input: &SubmitTask) -> Result<TaskRecord, CoreError> {
        let job_type = JobType::parse(&input.job_type)?;
        let args = JobArgs::decode(job_type, &input.args)?;

        let record = TaskRepo::enqueue(
            pool,
            job_type.as_str(),
            job_type.queue_name(),
            &args.to_value(),
        )
        .await
        .map_err(|e| CoreError::Dispatch(e.to_string()))?;

        tracing::info!(
            task_id = %record.id,
            job_type = %job_type,
            queue = %record.queue_name,
            "Job submitted",
        );
        Ok(record)
    }
}
