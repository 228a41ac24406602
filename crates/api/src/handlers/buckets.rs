//! Handlers for bucket connectivity checks.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use scoring_storage::{BucketClient, BucketDescriptor};

/// Connection parameters for an ad-hoc bucket probe. Credentials arrive
/// in the request body and are never persisted.
#[derive(Debug, Deserialize)]
pub struct TestBucketRequest {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub bucket_name: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// POST /api/v1/buckets/test
///
/// Probe the described bucket with a single-object listing. Returns 200
/// when the bucket is reachable with the given credentials, 503 with the
/// failure detail otherwise.
pub async fn test_bucket_connection(
    Json(input): Json<TestBucketRequest>,
) -> impl IntoResponse {
    let client = BucketClient::new(BucketDescriptor {
        endpoint: input.endpoint,
        access_key: input.access_key,
        secret_key: input.secret_key,
        region: input.region,
        bucket_name: input.bucket_name.clone(),
    });

    match client.check_connection().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "connected": true,
                "bucket_name": input.bucket_name,
                "message": "bucket is reachable",
            })),
        ),
        Err(e) => {
            tracing::warn!(bucket = input.bucket_name, error = %e, "Bucket probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "connected": false,
                    "bucket_name": input.bucket_name,
                    "error": e.to_string(),
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_defaults_when_omitted() {
        let input: TestBucketRequest = serde_json::from_value(serde_json::json!({
            "endpoint": "http://localhost:9000",
            "access_key": "mlflow",
            "secret_key": "mlflow",
            "bucket_name": "mlflow",
        }))
        .unwrap();
        assert_eq!(input.region, "us-east-1");
    }
}
