use std::sync::Arc;

use scoring_db::DbPool;

use crate::config::ServerConfig;

/// Shared application state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
}
