//! Shared response envelope types for API handlers.
//!
//! Resource-style responses use a `{ "data": ... }` envelope. The task
//! polling endpoint is the exception: it returns the normalized status
//! object bare, because polling clients consume that shape directly.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
