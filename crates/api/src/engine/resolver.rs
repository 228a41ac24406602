//! Status resolution: substrate record to client-facing status.

use scoring_core::status::{self, NormalizedStatus};
use scoring_core::types::TaskId;
use scoring_db::repositories::TaskRepo;
use scoring_db::DbPool;

/// Derives the normalized status of a task on demand.
///
/// Resolution is pure with respect to the record: nothing is written
/// back, and polling the same terminal record always yields the same
/// answer.
pub struct StatusResolver;

impl StatusResolver {
    /// Resolve one task handle.
    ///
    /// A handle the substrate has no record of resolves to the not-found
    /// failure variant rather than an error: polling an unknown id is an
    /// expected client behavior, not a server fault.
    pub async fn resolve(pool: &DbPool, task_id: TaskId) -> Result<NormalizedStatus, sqlx::Error> {
        let record = TaskRepo::find_by_id(pool, task_id).await?;
        let id = task_id.to_string();

        Ok(match record {
            Some(task) => status::normalize(
                &id,
                &task.status,
                task.result.as_ref(),
                task.error.as_deref(),
            ),
            None => status::not_found(&id),
        })
    }
}
