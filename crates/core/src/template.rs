//! MLflow training-script template rendering.
//!
//! The console offers a downloadable starter script for a recommended
//! model type. Rendering is plain string substitution over a fixed
//! skeleton; the script is never executed by this system.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Context for one rendered training script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub recommendation_id: DbId,
    pub dataset_id: DbId,
    pub dataset_name: String,
    pub model_type: String,
    /// Bucket endpoint the dataset is served from.
    pub bucket_endpoint: String,
}

impl TemplateContext {
    /// Name of the generated attachment.
    pub fn file_name(&self) -> String {
        format!("train_{}.py", self.dataset_name)
    }

    /// Experiment name registered by the script.
    pub fn experiment_name(&self) -> String {
        format!("{}_exp", self.dataset_name)
    }
}

/// Render the MLflow training script for the given context.
pub fn render_training_script(ctx: &TemplateContext) -> String {
    format!(
        r#""""MLflow training starter for dataset '{dataset_name}' (id {dataset_id}).

Generated from recommendation {recommendation_id}. Adjust the feature
selection and hyper-parameters before running for real.
"""

import mlflow
import pandas as pd

DATASET_ID = {dataset_id}
DATASET_NAME = "{dataset_name}"
DATASET_SOURCE = "s3"
DATASET_PATH = "{bucket_endpoint}"
MODEL_TYPE = "{model_type}"
TARGET_COLUMN = "none"

mlflow.set_experiment("{experiment_name}")


def load_dataset() -> pd.DataFrame:
    return pd.read_parquet(f"{{DATASET_PATH}}/{{DATASET_NAME}}")


def main() -> None:
    df = load_dataset()
    with mlflow.start_run():
        mlflow.log_param("dataset_id", DATASET_ID)
        mlflow.log_param("dataset_name", DATASET_NAME)
        mlflow.log_param("model_type", MODEL_TYPE)
        mlflow.log_param("rows", len(df))
        # TODO(recommendation {recommendation_id}): fit a {model_type} model here.


if __name__ == "__main__":
    main()
"#,
        dataset_name = ctx.dataset_name,
        dataset_id = ctx.dataset_id,
        recommendation_id = ctx.recommendation_id,
        bucket_endpoint = ctx.bucket_endpoint,
        model_type = ctx.model_type,
        experiment_name = ctx.experiment_name(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
