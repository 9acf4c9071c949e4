//! Single-model inference engine for credit risk scoring

use crate::config::ModelsConfig;
use crate::error::ScoringError;
use crate::feature_extractor::FeatureExtractor;
use crate::input_safety;
use crate::models::artifact::{ModelInfo, ModelMetadata};
use crate::models::loader::{ArtifactLoader, LoadedArtifacts, UNKNOWN_SCHEMA_VERSION};
use crate::models::sanity;
use crate::schema;
use crate::types::applicant::ApplicantRequest;
use crate::types::assessment::{PredictionResult, ProbabilitySource};
use crate::types::record::FeatureRow;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Inference engine owning one loaded model + preprocessor pair.
///
/// Artifacts are immutable after `load`, so a loaded engine can be shared
/// behind an `Arc` and called concurrently without locks.
pub struct InferenceEngine {
    artifacts_dir: PathBuf,
    /// Caller-chosen identifier reported by `model_info`
    model_id: String,
    loader: ArtifactLoader,
    artifacts: Option<LoadedArtifacts>,
}

impl InferenceEngine {
    /// Create and load an inference engine from configuration
    pub fn new(config: &ModelsConfig) -> Result<Self, ScoringError> {
        let loader = ArtifactLoader::new()
            .with_files(config.model_file.clone(), config.preprocessor_file.clone())
            .with_onnx_threads(config.onnx_threads);
        let mut engine = Self::unloaded(&config.artifacts_dir, config.model_id.clone(), loader);
        engine.load()?;
        Ok(engine)
    }

    /// Create and load an inference engine with default file names
    pub fn with_artifacts_dir<P: AsRef<Path>>(
        artifacts_dir: P,
        model_id: &str,
    ) -> Result<Self, ScoringError> {
        let mut engine = Self::unloaded(artifacts_dir, model_id.to_string(), ArtifactLoader::new());
        engine.load()?;
        Ok(engine)
    }

    /// Create an engine that has not loaded its artifacts yet
    pub fn unloaded<P: AsRef<Path>>(
        artifacts_dir: P,
        model_id: String,
        loader: ArtifactLoader,
    ) -> Self {
        Self {
            artifacts_dir: artifacts_dir.as_ref().to_path_buf(),
            model_id,
            loader,
            artifacts: None,
        }
    }

    /// Load (or reload) the artifacts. On failure the engine keeps its previous state.
    pub fn load(&mut self) -> Result<(), ScoringError> {
        let artifacts = self.loader.load_dir(&self.artifacts_dir)?;

        info!(
            model_id = %self.model_id,
            model_type = %artifacts.metadata.model_type,
            model_format = %artifacts.model_format,
            preprocessor_format = %artifacts.preprocessor_format,
            "Inference engine initialized"
        );

        self.artifacts = Some(artifacts);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.artifacts.is_some()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Schema version of the loaded artifacts, `"unknown"` when not declared or not loaded
    pub fn schema_version(&self) -> &str {
        self.artifacts
            .as_ref()
            .map(|a| a.schema_version.as_str())
            .unwrap_or(UNKNOWN_SCHEMA_VERSION)
    }

    /// Descriptive model information. Never exposes parameters or feature names.
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            is_loaded: self.is_loaded(),
            model_id: self.model_id.clone(),
            metadata: self
                .artifacts
                .as_ref()
                .map(|a| a.metadata.clone())
                .unwrap_or_else(ModelMetadata::unknown),
        }
    }

    /// Score a typed applicant request
    pub fn predict(&self, request: &ApplicantRequest) -> Result<PredictionResult, ScoringError> {
        let row = FeatureExtractor::new().extract(request);
        self.predict_row(&row)
    }

    /// Score one prepared row: schema check, input safety, transform, model, sanity gate
    pub fn predict_row(&self, row: &FeatureRow) -> Result<PredictionResult, ScoringError> {
        let artifacts = self.artifacts.as_ref().ok_or(ScoringError::NotLoaded)?;

        debug!(
            rows = 1,
            columns = row.len(),
            column_names = ?row.column_names().collect::<Vec<_>>(),
            "Prediction input"
        );

        schema::validate_row(row)?;
        input_safety::check_row(row).map_err(ScoringError::InputSafety)?;

        let (label, probability, probability_source) = run_model(artifacts, row).map_err(|e| {
            error!(error = %e, "Prediction failed");
            ScoringError::PredictionFailed { source: e }
        })?;

        if let Err(violation) = sanity::validate_outputs(label, probability) {
            error!(
                label = label,
                probability = probability,
                credit_score = ?row.number("credit_score"),
                loan_amount = ?row.number("loan_amount"),
                debt_to_income_ratio = ?row.number(schema::DTI_COLUMN),
                "Model output failed sanity checks"
            );
            return Err(violation.into());
        }

        let result = PredictionResult {
            label: if label == 1.0 { 1 } else { 0 },
            probability,
            probability_source,
        };

        debug!(
            label = result.label,
            probability = result.probability,
            source = ?result.probability_source,
            "Prediction complete"
        );

        Ok(result)
    }
}

/// Run the transform and the classifier on one row
fn run_model(
    artifacts: &LoadedArtifacts,
    row: &FeatureRow,
) -> Result<(f64, f64, ProbabilitySource)> {
    let features = artifacts.preprocessor.transform(row)?;
    let classifier = &artifacts.classifier;

    let label = classifier.predict_label(&features)?;

    if !classifier.supports_probability() {
        warn!(
            model_type = classifier.model_type(),
            "Model doesn't support probability output, using binary prediction as fallback"
        );
        return Ok((label, label, ProbabilitySource::LabelFallback));
    }

    let proba = classifier.predict_proba(&features)?;
    let probability = proba
        .get(1)
        .copied()
        .ok_or_else(|| anyhow!("probability output has {} classes, expected 2", proba.len()))?;

    Ok((label, probability, ProbabilitySource::Model))
}
