//! On-disk artifact formats and the metadata exposed about a loaded model.
//!
//! Both artifacts come in two shapes. The legacy shape is the bare object
//! (classifier spec or column transformer). The modern shape wraps it under
//! `model` / `pipeline` next to feature names, schema version and metadata.
//! The shape is detected once at load time and normalized immediately.

use super::classifier::ClassifierSpec;
use super::preprocessor::ColumnTransformer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata keys that are never exposed through model info
pub const SENSITIVE_KEYS: [&str; 11] = [
    "training_data",
    "model_weights",
    "weights",
    "coefficients",
    "coef",
    "intercept",
    "feature_importances",
    "trees",
    "estimators",
    "model_parameters",
    "feature_names",
];

/// True when a metadata key names model internals or training data
pub fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|denied| key.contains(denied))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Legacy,
    Modern,
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFormat::Legacy => f.write_str("legacy"),
            ArtifactFormat::Modern => f.write_str("modern"),
        }
    }
}

/// Wrapped model artifact
#[derive(Debug, Clone, Deserialize)]
pub struct WrappedModel {
    /// `null` here is a corrupt artifact, not a legacy one
    pub model: Option<ClassifierSpec>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_class: Option<String>,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone)]
pub enum ModelArtifact {
    Legacy(ClassifierSpec),
    Modern(WrappedModel),
}

impl ModelArtifact {
    /// Detect the shape: an object with a `model` key is the wrapped form.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        if value.get("model").is_some() {
            Ok(ModelArtifact::Modern(serde_json::from_value(value)?))
        } else {
            Ok(ModelArtifact::Legacy(serde_json::from_value(value)?))
        }
    }

    pub fn format(&self) -> ArtifactFormat {
        match self {
            ModelArtifact::Legacy(_) => ArtifactFormat::Legacy,
            ModelArtifact::Modern(_) => ArtifactFormat::Modern,
        }
    }
}

/// Wrapped preprocessor artifact
#[derive(Debug, Clone, Deserialize)]
pub struct WrappedPreprocessor {
    pub pipeline: Option<ColumnTransformer>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub schema_version: Option<String>,
}

#[derive(Debug, Clone)]
pub enum PreprocessorArtifact {
    Legacy(ColumnTransformer),
    Modern(WrappedPreprocessor),
}

impl PreprocessorArtifact {
    /// Detect the shape: an object with a `pipeline` key is the wrapped form.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        if value.get("pipeline").is_some() {
            Ok(PreprocessorArtifact::Modern(serde_json::from_value(value)?))
        } else {
            Ok(PreprocessorArtifact::Legacy(serde_json::from_value(value)?))
        }
    }

    pub fn format(&self) -> ArtifactFormat {
        match self {
            PreprocessorArtifact::Legacy(_) => ArtifactFormat::Legacy,
            PreprocessorArtifact::Modern(_) => ArtifactFormat::Modern,
        }
    }
}

/// Descriptive metadata of a loaded model. Never holds parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_type: String,
    pub model_name: String,
    pub training_timestamp: String,
    pub feature_count: usize,
    pub schema_version: String,
    pub evaluation_metrics: BTreeMap<String, f64>,
}

impl ModelMetadata {
    pub fn unknown() -> Self {
        Self {
            model_type: "unknown".to_string(),
            model_name: "unknown".to_string(),
            training_timestamp: "unknown".to_string(),
            feature_count: 0,
            schema_version: "unknown".to_string(),
            evaluation_metrics: BTreeMap::new(),
        }
    }

    /// Defaults for a legacy model, which carries no metadata of its own
    pub fn synthesized(model_type: &str, feature_count: usize, schema_version: &str) -> Self {
        Self {
            model_type: model_type.to_string(),
            feature_count,
            schema_version: schema_version.to_string(),
            ..Self::unknown()
        }
    }

    /// Build from a wrapped artifact. Explicit `metadata` entries win over the
    /// top-level fields, which win over the supplied fallbacks.
    pub fn from_wrapped(
        wrapped: &WrappedModel,
        fallback_type: &str,
        feature_count: usize,
        schema_version: &str,
    ) -> Self {
        let empty = Map::new();
        let explicit = wrapped.metadata.as_ref().unwrap_or(&empty);
        let text = |key: &str| explicit.get(key).and_then(Value::as_str).map(str::to_string);

        let metrics_source = explicit
            .get("evaluation_metrics")
            .and_then(Value::as_object)
            .unwrap_or(&wrapped.metrics);

        Self {
            model_type: text("model_type")
                .or_else(|| wrapped.model_class.clone())
                .unwrap_or_else(|| fallback_type.to_string()),
            model_name: text("model_name")
                .or_else(|| wrapped.model_name.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            training_timestamp: text("training_timestamp").unwrap_or_else(|| "unknown".to_string()),
            feature_count: explicit
                .get("feature_count")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .unwrap_or(feature_count),
            schema_version: text("schema_version").unwrap_or_else(|| schema_version.to_string()),
            evaluation_metrics: numeric_metrics(metrics_source),
        }
    }
}

/// Keep plain numeric metrics, dropping anything on the denylist
fn numeric_metrics(source: &Map<String, Value>) -> BTreeMap<String, f64> {
    source
        .iter()
        .filter(|(key, _)| !is_sensitive(key))
        .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
        .collect()
}

/// Public summary of the engine's model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub is_loaded: bool,
    /// Caller-chosen identifier of the artifact set
    pub model_id: String,
    #[serde(flatten)]
    pub metadata: ModelMetadata,
}
