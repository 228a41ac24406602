/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Task handles are UUIDv4, assigned at enqueue time and never reused.
pub type TaskId = uuid::Uuid;
