//! Model and preprocessor artifact loader

use super::artifact::{ArtifactFormat, ModelArtifact, ModelMetadata, PreprocessorArtifact};
use super::classifier::Classifier;
use super::preprocessor::ColumnTransformer;
use crate::error::{ArtifactKind, ScoringError};
use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use tracing::{error, info, warn};

const MODEL_HINT: &str = "Please train the model first using the training pipeline.";
const PREPROCESSOR_HINT: &str = "Please train the model first to generate preprocessing artifacts.";

/// Schema version reported when neither artifact declares one
pub const UNKNOWN_SCHEMA_VERSION: &str = "unknown";

/// Artifacts normalized into the one shape the engine works with
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub classifier: Box<dyn Classifier>,
    pub preprocessor: ColumnTransformer,
    pub feature_names: Vec<String>,
    pub schema_version: String,
    pub metadata: ModelMetadata,
    pub model_format: ArtifactFormat,
    pub preprocessor_format: ArtifactFormat,
}

/// Loader for the model + preprocessor artifact pair
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    model_file: String,
    preprocessor_file: String,
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a loader with the default file names (`model.json`, `preprocessor.json`)
    pub fn new() -> Self {
        Self {
            model_file: "model.json".to_string(),
            preprocessor_file: "preprocessor.json".to_string(),
            onnx_threads: 1,
        }
    }

    pub fn with_files(
        mut self,
        model_file: impl Into<String>,
        preprocessor_file: impl Into<String>,
    ) -> Self {
        self.model_file = model_file.into();
        self.preprocessor_file = preprocessor_file.into();
        self
    }

    pub fn with_onnx_threads(mut self, onnx_threads: usize) -> Self {
        self.onnx_threads = onnx_threads.max(1);
        self
    }

    /// Load both artifacts from a directory
    pub fn load_dir<P: AsRef<Path>>(
        &self,
        artifacts_dir: P,
    ) -> Result<LoadedArtifacts, ScoringError> {
        let artifacts_dir = artifacts_dir.as_ref();

        self.load_inner(artifacts_dir).map_err(|e| {
            error!(
                artifacts_dir = %artifacts_dir.display(),
                error = %e,
                "Failed to load model artifacts"
            );
            e
        })
    }

    fn load_inner(&self, artifacts_dir: &Path) -> Result<LoadedArtifacts, ScoringError> {
        let model_path = artifacts_dir.join(&self.model_file);
        let preprocessor_path = artifacts_dir.join(&self.preprocessor_file);

        if !model_path.exists() {
            return Err(ScoringError::ArtifactMissing {
                kind: ArtifactKind::Model,
                path: model_path,
                hint: MODEL_HINT,
            });
        }
        if !preprocessor_path.exists() {
            return Err(ScoringError::ArtifactMissing {
                kind: ArtifactKind::Preprocessor,
                path: preprocessor_path,
                hint: PREPROCESSOR_HINT,
            });
        }

        info!(path = %model_path.display(), "Loading model artifact");
        let model = ModelArtifact::from_json(read_json(&model_path)?).map_err(|e| {
            ScoringError::corrupt_with("model artifact has an unexpected structure", e.into())
        })?;
        log_format("model", model.format());

        info!(path = %preprocessor_path.display(), "Loading preprocessor artifact");
        let preprocessor =
            PreprocessorArtifact::from_json(read_json(&preprocessor_path)?).map_err(|e| {
                ScoringError::corrupt_with(
                    "preprocessor artifact has an unexpected structure",
                    e.into(),
                )
            })?;
        log_format("preprocessor", preprocessor.format());

        let model_format = model.format();
        let preprocessor_format = preprocessor.format();

        let (spec, model_names, model_version, wrapped) = match model {
            ModelArtifact::Legacy(spec) => (Some(spec), None, None, None),
            ModelArtifact::Modern(wrapped) => (
                wrapped.model.clone(),
                wrapped.feature_names.clone(),
                wrapped.schema_version.clone(),
                Some(wrapped),
            ),
        };
        let spec =
            spec.ok_or_else(|| ScoringError::corrupt("Model artifact is None after loading"))?;

        let (pipeline, preprocessor_names, preprocessor_version) = match preprocessor {
            PreprocessorArtifact::Legacy(pipeline) => (Some(pipeline), None, None),
            PreprocessorArtifact::Modern(wrapped) => {
                (wrapped.pipeline, wrapped.feature_names, wrapped.schema_version)
            }
        };
        let pipeline = pipeline
            .ok_or_else(|| ScoringError::corrupt("Preprocessor artifact is None after loading"))?;

        // model artifact wins; the preprocessor copy is only a fallback
        let feature_names = model_names.or(preprocessor_names).ok_or_else(|| {
            ScoringError::corrupt(
                "Feature names not found in artifacts. \
                 Model was trained with an older version. Please retrain.",
            )
        })?;
        let schema_version = model_version
            .or(preprocessor_version)
            .unwrap_or_else(|| UNKNOWN_SCHEMA_VERSION.to_string());

        pipeline.validate().map_err(ScoringError::corrupt)?;

        let classifier = spec.build(artifacts_dir, self.onnx_threads)?;
        if let Some(width) = classifier.input_width() {
            if width != pipeline.output_width() {
                return Err(ScoringError::corrupt(format!(
                    "model expects {} inputs but the preprocessor produces {}",
                    width,
                    pipeline.output_width()
                )));
            }
        }

        let metadata = match &wrapped {
            Some(wrapped) => ModelMetadata::from_wrapped(
                wrapped,
                classifier.model_type(),
                feature_names.len(),
                &schema_version,
            ),
            None => ModelMetadata::synthesized(
                classifier.model_type(),
                feature_names.len(),
                &schema_version,
            ),
        };

        info!(
            model_type = %metadata.model_type,
            feature_count = feature_names.len(),
            schema_version = %schema_version,
            "Model artifacts loaded successfully"
        );

        Ok(LoadedArtifacts {
            classifier,
            preprocessor: pipeline,
            feature_names,
            schema_version,
            metadata,
            model_format,
            preprocessor_format,
        })
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json(path: &Path) -> Result<Value, ScoringError> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .map_err(|e| ScoringError::corrupt_with("artifact could not be read", e))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))
        .map_err(|e| ScoringError::corrupt_with("artifact is not valid JSON", e))
}

fn log_format(artifact: &str, format: ArtifactFormat) {
    match format {
        ArtifactFormat::Modern => {
            info!(artifact = artifact, format = %format, "Detected artifact format")
        }
        ArtifactFormat::Legacy => warn!(
            artifact = artifact,
            format = %format,
            "Detected legacy artifact format without metadata"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        legacy_model, legacy_preprocessor, modern_model, modern_preprocessor, write_artifacts,
        write_json,
    };
    use serde_json::json;

    #[test]
    fn test_load_modern_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), &modern_model(), &modern_preprocessor());

        let loaded = ArtifactLoader::new().load_dir(dir.path()).unwrap();
        assert_eq!(loaded.model_format, ArtifactFormat::Modern);
        assert_eq!(loaded.preprocessor_format, ArtifactFormat::Modern);
        assert_eq!(loaded.feature_names.len(), 12);
        assert_eq!(loaded.schema_version, "v1");
        assert_eq!(loaded.metadata.model_name, "credit_risk_logreg");
        assert_eq!(loaded.metadata.evaluation_metrics["roc_auc"], 0.78);
        assert!(!loaded.metadata.evaluation_metrics.contains_key("coef"));
    }

    #[test]
    fn test_legacy_model_takes_names_from_preprocessor() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), &legacy_model(), &modern_preprocessor());

        let loaded = ArtifactLoader::new().load_dir(dir.path()).unwrap();
        assert_eq!(loaded.model_format, ArtifactFormat::Legacy);
        assert_eq!(loaded.feature_names.len(), 12);
        assert_eq!(loaded.metadata.model_type, "LogisticRegression");
        assert_eq!(loaded.metadata.model_name, "unknown");
        assert_eq!(loaded.metadata.training_timestamp, "unknown");
    }

    #[test]
    fn test_model_names_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let mut preprocessor = modern_preprocessor();
        preprocessor["schema_version"] = json!("v0");
        write_artifacts(dir.path(), &modern_model(), &preprocessor);

        let loaded = ArtifactLoader::new().load_dir(dir.path()).unwrap();
        assert_eq!(loaded.schema_version, "v1");
    }

    #[test]
    fn test_missing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), "preprocessor.json", &modern_preprocessor());

        match ArtifactLoader::new().load_dir(dir.path()) {
            Err(ScoringError::ArtifactMissing { kind, path, .. }) => {
                assert_eq!(kind, ArtifactKind::Model);
                assert!(path.ends_with("model.json"));
            }
            other => panic!("expected missing model, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_preprocessor_file() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), "model.json", &modern_model());

        let err = ArtifactLoader::new().load_dir(dir.path()).unwrap_err();
        assert_eq!(err.code(), "MODEL_NOT_FOUND");
        assert!(err.to_string().contains("preprocessing artifacts"));
    }

    #[test]
    fn test_null_model_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = modern_model();
        model["model"] = Value::Null;
        write_artifacts(dir.path(), &model, &modern_preprocessor());

        let err = ArtifactLoader::new().load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Model artifact is None after loading"));
    }

    #[test]
    fn test_no_feature_names_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), &legacy_model(), &legacy_preprocessor());

        let err = ArtifactLoader::new().load_dir(dir.path()).unwrap_err();
        assert_eq!(err.code(), "MODEL_LOAD_FAILED");
        assert!(err.to_string().contains("Feature names not found"));
    }

    #[test]
    fn test_invalid_json_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), "preprocessor.json", &modern_preprocessor());
        std::fs::write(dir.path().join("model.json"), "{ not json").unwrap();

        match ArtifactLoader::new().load_dir(dir.path()) {
            Err(ScoringError::ArtifactCorrupt { source, .. }) => assert!(source.is_some()),
            other => panic!("expected corrupt artifact, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_width_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = modern_model();
        model["model"]["coefficients"] = json!([0.1, 0.2]);
        write_artifacts(dir.path(), &model, &modern_preprocessor());

        let err = ArtifactLoader::new().load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("preprocessor produces"));
    }

    #[test]
    fn test_custom_file_names() {
        let dir = tempfile::tempdir().unwrap();
        write_json(dir.path(), "clf.json", &modern_model());
        write_json(dir.path(), "prep.json", &modern_preprocessor());

        let loader = ArtifactLoader::new().with_files("clf.json", "prep.json");
        assert!(loader.load_dir(dir.path()).is_ok());
    }
}
