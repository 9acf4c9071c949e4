//! Scoring service: one credit application in, one assessment out.
//!
//! Shares a single loaded engine and a single explainer across all callers.

use crate::error::ScoringError;
use crate::explain::ExplanationEngine;
use crate::feature_extractor::FeatureExtractor;
use crate::models::InferenceEngine;
use crate::types::assessment::{AssessmentFailure, CreditAssessment};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Per-feature attribution scores computed by the caller for this applicant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributions {
    pub feature_names: Vec<String>,
    pub values: Vec<f64>,
}

/// Incoming application message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditApplication {
    pub application_id: String,
    /// Raw applicant attributes; validated against the input schema
    pub applicant: Map<String, Value>,
    #[serde(default)]
    pub attributions: Option<Attributions>,
}

#[derive(Clone)]
pub struct ScoringService {
    engine: Arc<InferenceEngine>,
    explainer: ExplanationEngine,
    extractor: Arc<FeatureExtractor>,
}

impl ScoringService {
    pub fn new(engine: Arc<InferenceEngine>) -> Self {
        Self {
            engine,
            explainer: ExplanationEngine::new(),
            extractor: Arc::new(FeatureExtractor::new()),
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Validate, score and explain one application
    pub fn assess(
        &self,
        application: &CreditApplication,
    ) -> Result<CreditAssessment, ScoringError> {
        let row = self.extractor.extract_json(&application.applicant);
        let prediction = self.engine.predict_row(&row)?;

        let (names, values) = match &application.attributions {
            Some(a) => (a.feature_names.as_slice(), a.values.as_slice()),
            None => {
                debug!(application_id = %application.application_id, "No attributions supplied");
                (&[] as &[String], &[] as &[f64])
            }
        };

        let explanation = self.explainer.explain(values, names, &row, prediction.probability)?;

        let assessment =
            CreditAssessment::new(application.application_id.clone(), prediction, explanation);
        Ok(assessment.with_model(
            self.engine.model_id().to_string(),
            self.engine.schema_version().to_string(),
        ))
    }

    /// Sanitized failure record. The full error, including its cause chain,
    /// is logged here and never published.
    pub fn failure(application_id: &str, err: &ScoringError) -> AssessmentFailure {
        if err.is_client_error() {
            warn!(
                application_id = %application_id,
                code = err.code(),
                error = %err,
                "Application rejected"
            );
        } else {
            error!(
                application_id = %application_id,
                code = err.code(),
                error = ?err,
                "Application could not be scored"
            );
        }

        AssessmentFailure {
            application_id: application_id.to_string(),
            code: err.code().to_string(),
            message: err.public_message(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaValidationError;
    use crate::test_support::{
        modern_model, modern_preprocessor, sample_applicant_json, write_artifacts,
    };
    use crate::types::assessment::RiskBand;
    use serde_json::json;

    fn service() -> (tempfile::TempDir, ScoringService) {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path(), &modern_model(), &modern_preprocessor());
        let engine = InferenceEngine::with_artifacts_dir(dir.path(), "credit_risk_v1").unwrap();
        (dir, ScoringService::new(Arc::new(engine)))
    }

    fn application(attributions: Option<Attributions>) -> CreditApplication {
        CreditApplication {
            application_id: "app-1".to_string(),
            applicant: sample_applicant_json(),
            attributions,
        }
    }

    #[test]
    fn test_assess_without_attributions() {
        let (_dir, service) = service();
        let assessment = service.assess(&application(None)).unwrap();

        assert_eq!(assessment.application_id, "app-1");
        assert_eq!(assessment.model_id, "credit_risk_v1");
        assert_eq!(assessment.schema_version, "v1");
        assert_eq!(assessment.risk_band, RiskBand::Low);
        assert_eq!(assessment.risk_band, assessment.prediction.risk_band());
        assert!(assessment.explanation.top_positive_features.is_empty());
        assert_eq!(
            assessment.explanation.what_helped,
            vec!["Overall financial profile is stable".to_string()]
        );
    }

    #[test]
    fn test_assess_with_attributions() {
        let (_dir, service) = service();
        let attributions = Attributions {
            feature_names: vec!["credit_score".to_string(), "monthly_debt".to_string()],
            values: vec![-0.4, 0.1],
        };
        let assessment = service.assess(&application(Some(attributions))).unwrap();

        let explanation = &assessment.explanation;
        assert_eq!(explanation.top_positive_features[0].feature_name, "credit_score");
        assert_eq!(
            explanation.what_hurt,
            vec!["Monthly debt obligations ($1,500) add financial strain".to_string()]
        );
    }

    #[test]
    fn test_caller_dti_is_replaced() {
        let (_dir, service) = service();
        let mut app = application(None);
        app.applicant.insert("debt_to_income_ratio".to_string(), json!(42.0));
        assert!(service.assess(&app).is_ok());
    }

    #[test]
    fn test_schema_failure_is_sanitized() {
        let (_dir, service) = service();
        let mut app = application(None);
        app.applicant.remove("credit_score");
        app.applicant.insert("ssn".to_string(), json!("123-45-6789"));

        let err = service.assess(&app).unwrap_err();
        let failure = ScoringService::failure(&app.application_id, &err);
        assert_eq!(failure.code, "SCHEMA_VALIDATION_ERROR");
        assert!(failure.message.contains("Missing required columns: [credit_score]"));
        assert!(failure.message.contains("Unexpected columns found: [ssn]"));
    }

    #[test]
    fn test_string_income_reports_type_error() {
        let (_dir, service) = service();
        let mut app = application(None);
        app.applicant.insert("annual_income".to_string(), json!("60000"));

        match service.assess(&app).unwrap_err() {
            ScoringError::Schema(SchemaValidationError::Types(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("'annual_income' must be numeric"));
            }
            other => panic!("expected a type error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_income_is_reported_by_name() {
        let (_dir, service) = service();
        let mut app = application(None);
        app.applicant.remove("annual_income");

        let message = service.assess(&app).unwrap_err().public_message();
        assert!(message.contains("Missing required columns: [annual_income]."));
    }

    #[test]
    fn test_medium_band_without_attributions_uses_fixed_fallbacks() {
        let (_dir, service) = service();
        let mut app = application(None);
        // pushes the fixture model into the 0.3..0.6 band
        app.applicant.insert("credit_score".to_string(), json!(640));
        app.applicant.insert("delinquencies_2y".to_string(), json!(1));

        let assessment = service.assess(&app).unwrap();
        assert_eq!(assessment.risk_band, RiskBand::Medium);
        assert_eq!(
            assessment.explanation.how_to_improve,
            vec!["Maintain current financial practices".to_string()]
        );
    }

    #[test]
    fn test_explanation_failure() {
        let (_dir, service) = service();
        let attributions = Attributions {
            feature_names: vec!["credit_score".to_string()],
            values: vec![0.1, 0.2],
        };
        let err = service.assess(&application(Some(attributions))).unwrap_err();
        assert_eq!(err.code(), "EXPLANATION_FAILED");
    }

    #[test]
    fn test_application_deserialization() {
        let app: CreditApplication = serde_json::from_value(json!({
            "application_id": "app-7",
            "applicant": { "annual_income": 50000 }
        }))
        .unwrap();
        assert!(app.attributions.is_none());
        assert_eq!(app.applicant.len(), 1);
    }
}
