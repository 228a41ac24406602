//! Route definitions for the `/buckets` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::buckets;
use crate::state::AppState;

/// Routes mounted at `/buckets`.
///
/// ```text
/// POST   /test            -> test_bucket_connection
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/test", post(buckets::test_bucket_connection))
}
