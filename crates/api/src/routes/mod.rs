pub mod buckets;
pub mod health;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tasks                   submit (POST), list (GET)
/// /tasks/{id}              normalized status (GET)
/// /buckets/test            bucket connectivity probe (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tasks", tasks::router())
        .nest("/buckets", buckets::router())
}
