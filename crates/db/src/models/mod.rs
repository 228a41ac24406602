//! Row structs and DTOs for the task substrate.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the operations the API accepts

pub mod task;
