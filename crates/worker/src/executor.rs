//! Task claim loop and job bodies.
//!
//! Polls the owned queues every `poll_interval` and executes claimed
//! tasks inline. Uses `SELECT FOR UPDATE SKIP LOCKED` via
//! [`TaskRepo::claim_next`] so multiple worker processes never
//! double-claim a message. Failed jobs are marked `failed` and never
//! retried.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use scoring_core::error::CoreError;
use scoring_core::job::{JobArgs, JobType};
use scoring_core::template::{render_training_script, TemplateContext};
use scoring_db::models::task::TaskRecord;
use scoring_db::repositories::TaskRepo;
use scoring_storage::Mover;

/// Queues whose job bodies this binary owns. The ML queues are consumed
/// by the external training fleet.
pub const OWNED_QUEUES: &[&str] = &["upload", "template"];

/// Default polling interval for the claim loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Job bodies
// ---------------------------------------------------------------------------

/// Executes decoded jobs. Split from the claim loop so job bodies are
/// testable without a database.
pub struct JobRunner {
    mover: Arc<Mover>,
    /// Destination bucket name, echoed into upload result payloads.
    bucket_name: String,
    /// Bucket endpoint, rendered into generated training scripts.
    bucket_endpoint: String,
}

impl JobRunner {
    pub fn new(mover: Arc<Mover>, bucket_name: String, bucket_endpoint: String) -> Self {
        Self {
            mover,
            bucket_name,
            bucket_endpoint,
        }
    }

    /// Run one job body to completion and produce its result payload.
    ///
    /// An upload whose files all fail still returns `Ok`: the substrate
    /// status becomes `done` and the payload carries `error: true`, so
    /// the resolver reports the application-level failure. `Err` is
    /// reserved for jobs that could not run at all.
    pub async fn run(&self, args: &JobArgs) -> Result<Value, CoreError> {
        match args {
            JobArgs::Upload(a) => {
                let outcome = self.mover.move_dataset(&a.source, &a.dataset_name).await?;
                Ok(outcome.to_report(a.dataset_id, &a.dataset_name, &self.bucket_name))
            }
            JobArgs::GenerateTemplate(a) => {
                let ctx = TemplateContext {
                    recommendation_id: a.recommendation_id,
                    dataset_id: a.dataset_id,
                    dataset_name: a.dataset_name.clone(),
                    model_type: a.model_type.clone(),
                    bucket_endpoint: self.bucket_endpoint.clone(),
                };
                let script = render_training_script(&ctx);
                Ok(json!({
                    "error": false,
                    "message": format!("generated training script for '{}'", a.dataset_name),
                    "dataset_id": a.dataset_id,
                    "dataset_name": a.dataset_name,
                    "results": {
                        "file_name": ctx.file_name(),
                        "experiment_name": ctx.experiment_name(),
                        "script": script,
                    },
                }))
            }
            other => Err(CoreError::Internal(format!(
                "job type '{}' is not handled by this worker",
                other.job_type()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Claim loop
// ---------------------------------------------------------------------------

/// Long-lived claim loop over the owned queues.
pub struct TaskExecutor {
    pool: PgPool,
    runner: JobRunner,
    poll_interval: Duration,
}

impl TaskExecutor {
    /// Create an executor with the default 1-second poll interval.
    pub fn new(pool: PgPool, runner: JobRunner) -> Self {
        Self {
            pool,
            runner,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Run the claim loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            queues = ?OWNED_QUEUES,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Task executor started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Task executor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain_once(&cancel).await {
                        tracing::error!(error = %e, "Claim cycle failed");
                    }
                }
            }
        }
    }

    /// One cycle: claim and execute until the owned queues are empty or
    /// shutdown is requested.
    async fn drain_once(&self, cancel: &CancellationToken) -> Result<(), sqlx::Error> {
        while !cancel.is_cancelled() {
            let Some(task) = TaskRepo::claim_next(&self.pool, OWNED_QUEUES).await? else {
                return Ok(());
            };
            tracing::info!(
                task_id = %task.id,
                job_type = %task.job_type,
                queue = %task.queue_name,
                "Task claimed",
            );
            self.execute(&task).await?;
        }
        Ok(())
    }

    /// Execute one claimed task and drive it to a terminal status.
    async fn execute(&self, task: &TaskRecord) -> Result<(), sqlx::Error> {
        let decoded = JobType::parse(&task.job_type)
            .and_then(|job_type| JobArgs::decode(job_type, &task.args));

        let args = match decoded {
            Ok(args) => args,
            Err(e) => {
                // Bad rows can only come from out-of-band writes; they are
                // failed, not dropped, so they stop being re-claimed.
                tracing::error!(task_id = %task.id, error = %e, "Undecodable task");
                return TaskRepo::fail(&self.pool, task.id, &e.to_string()).await;
            }
        };

        match self.runner.run(&args).await {
            Ok(result) => {
                tracing::info!(task_id = %task.id, "Task completed");
                TaskRepo::complete(&self.pool, task.id, &result).await
            }
            Err(e) => {
                tracing::error!(task_id = %task.id, error = %e, "Task failed");
                TaskRepo::fail(&self.pool, task.id, &e.to_string()).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
