//! Job type vocabulary and typed argument shapes.
//!
//! Every job submitted to the queue substrate is one of the fixed
//! [`JobType`] variants. Arguments arrive from the web layer as raw JSON
//! and are decoded + validated here before anything is enqueued, so a
//! malformed submission never creates partial state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Job types
// ---------------------------------------------------------------------------

/// The fixed enumeration of background job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Train,
    Predict,
    Audit,
    Analyse,
    Upload,
    GenerateTemplate,
}

impl JobType {
    /// Stable wire name, used as the `job_type` column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Train => "train",
            JobType::Predict => "predict",
            JobType::Audit => "audit",
            JobType::Analyse => "analyse",
            JobType::Upload => "upload",
            JobType::GenerateTemplate => "generate_template",
        }
    }

    /// Parse a wire name, rejecting anything outside the fixed set.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "train" => Ok(JobType::Train),
            "predict" => Ok(JobType::Predict),
            "audit" => Ok(JobType::Audit),
            "analyse" => Ok(JobType::Analyse),
            "upload" => Ok(JobType::Upload),
            "generate_template" => Ok(JobType::GenerateTemplate),
            other => Err(CoreError::Validation(format!(
                "Unknown job type: '{other}'"
            ))),
        }
    }

    /// Substrate queue this job type is routed to. Each queue is consumed
    /// by the worker fleet that owns the job body (the ML queues by the
    /// external training fleet, `upload`/`template` by our worker binary).
    pub fn queue_name(&self) -> &'static str {
        match self {
            JobType::Train => "train",
            JobType::Predict => "predict",
            JobType::Audit => "audit",
            JobType::Analyse => "analyse",
            JobType::Upload => "upload",
            JobType::GenerateTemplate => "template",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Argument shapes
// ---------------------------------------------------------------------------

/// `train(dataset_path, checkpoint)`: paths into the shared model store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainArgs {
    pub dataset_path: String,
    pub checkpoint: String,
}

/// `predict(checkpoint, client)`: `client` is an opaque feature record
/// consumed by the prediction worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictArgs {
    pub checkpoint: String,
    pub client: Value,
}

/// `audit(dataset_id, save_report, report_path?)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditArgs {
    pub dataset_id: DbId,
    #[serde(default = "default_save_report")]
    pub save_report: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
}

fn default_save_report() -> bool {
    true
}

/// `analyse(dataset_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyseArgs {
    pub dataset_id: DbId,
}

/// `upload(dataset_id, dataset_name, source)`.
///
/// The console resolves the dataset registry row to its name and source
/// before submission; the worker never reads the registry itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadArgs {
    pub dataset_id: DbId,
    pub dataset_name: String,
    pub source: String,
}

/// `generate_template(recommendation_id, model_type, dataset_id,
/// dataset_name)`. Like [`UploadArgs`], the registry row is resolved to
/// its name before submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateArgs {
    pub recommendation_id: DbId,
    pub model_type: String,
    pub dataset_id: DbId,
    pub dataset_name: String,
}

/// A fully decoded and validated job submission.
#[derive(Debug, Clone)]
pub enum JobArgs {
    Train(TrainArgs),
    Predict(PredictArgs),
    Audit(AuditArgs),
    Analyse(AnalyseArgs),
    Upload(UploadArgs),
    GenerateTemplate(TemplateArgs),
}

impl JobArgs {
    /// Decode raw JSON arguments for the given job type and validate them.
    ///
    /// Fails with [`CoreError::Validation`] on shape mismatch or invalid
    /// field values; nothing is enqueued in that case.
    pub fn decode(job_type: JobType, raw: &Value) -> Result<Self, CoreError> {
        fn from_value<T: serde::de::DeserializeOwned>(
            job_type: JobType,
            raw: &Value,
        ) -> Result<T, CoreError> {
            serde_json::from_value(raw.clone()).map_err(|e| {
                CoreError::Validation(format!("Invalid arguments for '{job_type}': {e}"))
            })
        }

        let args = match job_type {
            JobType::Train => JobArgs::Train(from_value(job_type, raw)?),
            JobType::Predict => JobArgs::Predict(from_value(job_type, raw)?),
            JobType::Audit => JobArgs::Audit(from_value(job_type, raw)?),
            JobType::Analyse => JobArgs::Analyse(from_value(job_type, raw)?),
            JobType::Upload => JobArgs::Upload(from_value(job_type, raw)?),
            JobType::GenerateTemplate => JobArgs::GenerateTemplate(from_value(job_type, raw)?),
        };
        args.validate()?;
        Ok(args)
    }

    /// Field-level validation rules.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            JobArgs::Train(a) => {
                require_non_empty("dataset_path", &a.dataset_path)?;
                require_non_empty("checkpoint", &a.checkpoint)?;
            }
            JobArgs::Predict(a) => {
                require_non_empty("checkpoint", &a.checkpoint)?;
                if !a.client.is_object() {
                    return Err(CoreError::Validation(
                        "client must be a JSON object of features".to_string(),
                    ));
                }
            }
            JobArgs::Audit(a) => {
                require_positive_id("dataset_id", a.dataset_id)?;
                if let Some(path) = &a.report_path {
                    require_non_empty("report_path", path)?;
                }
            }
            JobArgs::Analyse(a) => require_positive_id("dataset_id", a.dataset_id)?,
            JobArgs::Upload(a) => {
                require_positive_id("dataset_id", a.dataset_id)?;
                require_non_empty("dataset_name", &a.dataset_name)?;
                require_non_empty("source", &a.source)?;
            }
            JobArgs::GenerateTemplate(a) => {
                require_positive_id("recommendation_id", a.recommendation_id)?;
                require_positive_id("dataset_id", a.dataset_id)?;
                require_non_empty("model_type", &a.model_type)?;
                require_non_empty("dataset_name", &a.dataset_name)?;
            }
        }
        Ok(())
    }

    /// Re-serialize to the JSON stored in the substrate's `args` column.
    pub fn to_value(&self) -> Value {
        match self {
            JobArgs::Train(a) => serde_json::to_value(a),
            JobArgs::Predict(a) => serde_json::to_value(a),
            JobArgs::Audit(a) => serde_json::to_value(a),
            JobArgs::Analyse(a) => serde_json::to_value(a),
            JobArgs::Upload(a) => serde_json::to_value(a),
            JobArgs::GenerateTemplate(a) => serde_json::to_value(a),
        }
        // Serializing structs of plain fields cannot fail.
        .unwrap_or(Value::Null)
    }

    pub fn job_type(&self) -> JobType {
        match self {
            JobArgs::Train(_) => JobType::Train,
            JobArgs::Predict(_) => JobType::Predict,
            JobArgs::Audit(_) => JobType::Audit,
            JobArgs::Analyse(_) => JobType::Analyse,
            JobArgs::Upload(_) => JobType::Upload,
            JobArgs::GenerateTemplate(_) => JobType::GenerateTemplate,
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

fn require_positive_id(field: &str, value: DbId) -> Result<(), CoreError> {
    if value <= 0 {
        return Err(CoreError::Validation(format!(
            "{field} must be a positive id, got {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    // -- JobType ---------------------------------------------------------------

    #[test]
    fn parse_known_job_types() {
        assert_eq!(JobType::parse("train").unwrap(), JobType::Train);
        assert_eq!(
            JobType::parse("generate_template").unwrap(),
            JobType::GenerateTemplate
        );
    }

    #[test]
    fn parse_unknown_job_type_rejected() {
        assert_matches!(JobType::parse("compress"), Err(CoreError::Validation(_)));
        assert_matches!(JobType::parse(""), Err(CoreError::Validation(_)));
    }

    #[test]
    fn wire_names_round_trip() {
        for jt in [
            JobType::Train,
            JobType::Predict,
            JobType::Audit,
            JobType::Analyse,
            JobType::Upload,
            JobType::GenerateTemplate,
        ] {
            assert_eq!(JobType::parse(jt.as_str()).unwrap(), jt);
        }
    }

    // -- decode ----------------------------------------------------------------

    #[test]
    fn decode_train_args() {
        let args = JobArgs::decode(
            JobType::Train,
            &json!({"dataset_path": "/data/app.parquet", "checkpoint": "/models/xgb.model"}),
        )
        .unwrap();
        assert_matches!(args, JobArgs::Train(a) if a.checkpoint == "/models/xgb.model");
    }

    #[test]
    fn decode_rejects_missing_fields() {
        let err = JobArgs::decode(JobType::Train, &json!({"dataset_path": "/data"}));
        assert_matches!(err, Err(CoreError::Validation(_)));
    }

    #[test]
    fn decode_rejects_empty_checkpoint() {
        let err = JobArgs::decode(
            JobType::Train,
            &json!({"dataset_path": "/data", "checkpoint": "  "}),
        );
        assert_matches!(err, Err(CoreError::Validation(_)));
    }

    #[test]
    fn decode_audit_defaults_save_report() {
        let args = JobArgs::decode(JobType::Audit, &json!({"dataset_id": 7})).unwrap();
        assert_matches!(args, JobArgs::Audit(a) => {
            assert!(a.save_report);
            assert_eq!(a.report_path, None);
        });
    }

    #[test]
    fn decode_rejects_non_positive_dataset_id() {
        let err = JobArgs::decode(JobType::Analyse, &json!({"dataset_id": 0}));
        assert_matches!(err, Err(CoreError::Validation(_)));
    }

    #[test]
    fn decode_predict_requires_object_client() {
        let err = JobArgs::decode(
            JobType::Predict,
            &json!({"checkpoint": "/models/xgb.model", "client": [1, 2, 3]}),
        );
        assert_matches!(err, Err(CoreError::Validation(_)));
    }

    #[test]
    fn decode_upload_args() {
        let args = JobArgs::decode(
            JobType::Upload,
            &json!({
                "dataset_id": 3,
                "dataset_name": "home-credit",
                "source": "https://example.com/home-credit.zip"
            }),
        )
        .unwrap();
        assert_eq!(args.job_type(), JobType::Upload);
        assert_eq!(args.job_type().queue_name(), "upload");
    }

    #[test]
    fn args_round_trip_through_value() {
        let args = JobArgs::decode(
            JobType::GenerateTemplate,
            &json!({
                "recommendation_id": 1,
                "model_type": "LightGBM",
                "dataset_id": 2,
                "dataset_name": "home-credit"
            }),
        )
        .unwrap();
        let value = args.to_value();
        assert_eq!(value["model_type"], "LightGBM");
        // Decoding the serialized form yields the same validated shape.
        JobArgs::decode(JobType::GenerateTemplate, &value).unwrap();
    }
}
