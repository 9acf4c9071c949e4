//! Type definitions for the scoring pipeline

pub mod applicant;
pub mod assessment;
pub mod record;

pub use applicant::ApplicantRequest;
pub use assessment::{
    AssessmentFailure, CreditAssessment, PredictionResult, ProbabilitySource, RiskBand,
};
pub use record::{FeatureRow, FeatureValue};
