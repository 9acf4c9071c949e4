//! Error taxonomy for the scoring pipeline.
//!
//! Every failure carries a stable machine code and a public message. Wrapped
//! causes are kept as `source` for logs and are never part of the public message.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two required artifacts a load error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Model,
    Preprocessor,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Model => f.write_str("Model"),
            ArtifactKind::Preprocessor => f.write_str("Preprocessor"),
        }
    }
}

/// Top-level error returned by the loader, engine, explainer and service.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Required artifact file is absent.
    #[error("{kind} file not found at {}. {hint}", .path.display())]
    ArtifactMissing {
        kind: ArtifactKind,
        path: PathBuf,
        hint: &'static str,
    },

    /// Artifact present but unreadable or incomplete.
    #[error(
        "Failed to load model artifacts: {reason}. \
         Please check that the model was trained correctly."
    )]
    ArtifactCorrupt {
        reason: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    /// Business-range and consistency violations, all of them at once.
    #[error("Input failed safety checks: {}", .0.join("; "))]
    InputSafety(Vec<String>),

    /// Transform or model call failed. The cause stays internal.
    #[error("Prediction failed during processing")]
    PredictionFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    OutputIntegrity(#[from] IntegrityViolation),

    #[error("Model not loaded. Cannot make predictions.")]
    NotLoaded,

    #[error(transparent)]
    Explanation(#[from] ExplanationError),
}

impl ScoringError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        ScoringError::ArtifactCorrupt {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn corrupt_with(reason: impl Into<String>, source: anyhow::Error) -> Self {
        ScoringError::ArtifactCorrupt {
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Stable error code for the serving layer
    pub fn code(&self) -> &'static str {
        match self {
            ScoringError::ArtifactMissing { .. } => "MODEL_NOT_FOUND",
            ScoringError::ArtifactCorrupt { .. } => "MODEL_LOAD_FAILED",
            ScoringError::Schema(_) => "SCHEMA_VALIDATION_ERROR",
            ScoringError::InputSafety(_) => "INPUT_VALIDATION_ERROR",
            ScoringError::PredictionFailed { .. } => "PREDICTION_FAILED",
            ScoringError::OutputIntegrity(_) => "OUTPUT_INTEGRITY_VIOLATION",
            ScoringError::NotLoaded => "MODEL_NOT_LOADED",
            ScoringError::Explanation(_) => "EXPLANATION_FAILED",
        }
    }

    /// Message safe to hand to an external caller.
    ///
    /// Validation errors are returned in full since they only describe the
    /// caller's own input. Everything else gets a fixed sentence.
    pub fn public_message(&self) -> String {
        match self {
            ScoringError::Schema(e) => e.to_string(),
            ScoringError::InputSafety(_) | ScoringError::Explanation(_) => self.to_string(),
            ScoringError::ArtifactMissing { .. }
            | ScoringError::ArtifactCorrupt { .. }
            | ScoringError::NotLoaded => {
                "Risk model is unavailable. Please try again later.".to_string()
            }
            ScoringError::PredictionFailed { .. } => {
                "Prediction failed during processing. Please try again later.".to_string()
            }
            ScoringError::OutputIntegrity(_) => {
                "Model produced an invalid result. Please contact support.".to_string()
            }
        }
    }

    /// True for errors caused by the caller's input rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScoringError::Schema(_) | ScoringError::InputSafety(_) | ScoringError::Explanation(_)
        )
    }
}

/// Input record does not match the closed 12-column contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaValidationError {
    #[error("{}", columns_message(.missing, .extra, .expected))]
    Columns {
        missing: Vec<String>,
        extra: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Data type validation failed:\n{}", .0.join("\n"))]
    Types(Vec<String>),
}

fn columns_message(missing: &[String], extra: &[String], expected: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing required columns: [{}].", missing.join(", ")));
    }
    if !extra.is_empty() {
        parts.push(format!(
            "Unexpected columns found: [{}]. Extra columns are not allowed to prevent silent errors.",
            extra.join(", ")
        ));
    }
    parts.push(format!("Expected columns: [{}]", expected.join(", ")));
    parts.join(" ")
}

/// Pathological model output caught before it leaves the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrityViolation {
    #[error(
        "CRITICAL: Model returned NaN prediction. \
         This indicates a serious model error. Please contact support."
    )]
    LabelNaN,

    #[error(
        "CRITICAL: Model returned NaN probability. \
         This indicates a serious model error. Please contact support."
    )]
    ProbabilityNaN,

    #[error(
        "CRITICAL: Model returned infinite prediction ({0}). \
         This indicates a serious model error. Please contact support."
    )]
    LabelInfinite(f64),

    #[error(
        "CRITICAL: Model returned infinite probability ({0}). \
         This indicates a serious model error. Please contact support."
    )]
    ProbabilityInfinite(f64),

    #[error(
        "CRITICAL: Model returned invalid prediction: {0}. \
         Expected 0 (no default) or 1 (default). Please contact support."
    )]
    InvalidLabel(f64),

    #[error(
        "CRITICAL: Model returned invalid probability: {0}. \
         Expected value between 0.0 and 1.0. Please contact support."
    )]
    ProbabilityOutOfRange(f64),
}

/// Malformed explanation request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplanationError {
    #[error("Attribution vector has {values} values but {names} feature names were given")]
    LengthMismatch { values: usize, names: usize },

    #[error("Attribution value for '{feature}' is not finite")]
    NonFiniteAttribution { feature: String },

    #[error("Prediction probability {0} is outside [0.0, 1.0]")]
    InvalidProbability(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_names_path() {
        let err = ScoringError::ArtifactMissing {
            kind: ArtifactKind::Preprocessor,
            path: PathBuf::from("models/preprocessor.json"),
            hint: "Please train the model first to generate preprocessing artifacts.",
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Preprocessor file not found at models/preprocessor.json"));
        assert!(msg.contains("train the model first"));
        assert_eq!(err.code(), "MODEL_NOT_FOUND");
    }

    #[test]
    fn test_public_message_hides_cause() {
        let err = ScoringError::PredictionFailed {
            source: anyhow::anyhow!("matrix width 14 does not match /srv/models/model.json"),
        };
        assert!(!err.public_message().contains("/srv/models"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_columns_message_lists_everything() {
        let err = SchemaValidationError::Columns {
            missing: vec!["credit_score".to_string()],
            extra: vec!["extra_field".to_string()],
            expected: vec!["annual_income".to_string(), "credit_score".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Missing required columns: [credit_score]"));
        assert!(msg.contains("Unexpected columns found: [extra_field]"));
        assert!(msg.contains("Expected columns: [annual_income, credit_score]"));
    }
}
