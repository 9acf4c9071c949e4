//! Prediction and assessment data structures

use crate::explain::ExplanationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse risk tier derived from the default probability.
///
/// Bands are half-open: `[0, 0.3)` low, `[0.3, 0.6)` medium, `[0.6, 1.0]` high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    /// Lower bound of the medium band
    pub const MEDIUM_THRESHOLD: f64 = 0.3;
    /// Lower bound of the high band
    pub const HIGH_THRESHOLD: f64 = 0.6;

    /// Determine the band for a probability of default
    pub fn from_probability(probability: f64) -> Self {
        if probability < Self::MEDIUM_THRESHOLD {
            RiskBand::Low
        } else if probability < Self::HIGH_THRESHOLD {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Medium => "medium",
            RiskBand::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low Risk",
            RiskBand::Medium => "Moderate Risk",
            RiskBand::High => "High Risk",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskBand::Low => "Strong financial profile with minimal default risk",
            RiskBand::Medium => "Acceptable risk with some areas of concern",
            RiskBand::High => "Elevated default probability requiring careful review",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskBand::Low => "green",
            RiskBand::Medium => "yellow",
            RiskBand::High => "red",
        }
    }
}

/// Where the reported probability came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilitySource {
    /// Positive-class mass from the model's probability output
    Model,
    /// Binary label cast to 0.0 / 1.0 because the model has no probability output
    LabelFallback,
}

/// Validated model output for one applicant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 0 = no default, 1 = default
    pub label: u8,
    /// Probability of default (0.0 - 1.0)
    pub probability: f64,
    pub probability_source: ProbabilitySource,
}

impl PredictionResult {
    pub fn risk_band(&self) -> RiskBand {
        RiskBand::from_probability(self.probability)
    }
}

/// Scored application published back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditAssessment {
    /// Unique assessment identifier
    pub assessment_id: String,

    /// Caller's application identifier
    pub application_id: String,

    pub prediction: PredictionResult,

    pub risk_band: RiskBand,

    pub explanation: ExplanationResult,

    /// Identifier of the artifact set that produced the score
    pub model_id: String,

    pub schema_version: String,

    pub timestamp: DateTime<Utc>,
}

impl CreditAssessment {
    pub fn new(
        application_id: String,
        prediction: PredictionResult,
        explanation: ExplanationResult,
    ) -> Self {
        Self {
            assessment_id: uuid::Uuid::new_v4().to_string(),
            application_id,
            risk_band: explanation.risk_band,
            prediction,
            explanation,
            model_id: String::new(),
            schema_version: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the identifiers of the artifacts used
    pub fn with_model(mut self, model_id: String, schema_version: String) -> Self {
        self.model_id = model_id;
        self.schema_version = schema_version;
        self
    }
}

/// Sanitized failure published when an application cannot be scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFailure {
    pub application_id: String,
    /// Stable error code, e.g. `SCHEMA_VALIDATION_ERROR`
    pub code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
