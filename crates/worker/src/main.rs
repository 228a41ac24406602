use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scoring_storage::Mover;
use scoring_worker::executor::{JobRunner, TaskExecutor};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scoring_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = scoring_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    scoring_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    // --- Mover ---
    // A missing bucket is tolerated at startup; upload jobs then fail
    // with a configuration error instead of the process refusing to run.
    let mover = Mover::from_env().expect("Invalid bucket configuration");
    let bucket_name = std::env::var("BUCKET_NAME").unwrap_or_default();
    let bucket_endpoint = std::env::var("BUCKET_ENDPOINT").unwrap_or_default();

    let runner = JobRunner::new(Arc::new(mover), bucket_name, bucket_endpoint);
    let executor = TaskExecutor::new(pool, runner);

    // --- Claim loop ---
    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        executor.run(loop_cancel).await;
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping executor");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C)");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}
