//! Credit Risk Scoring Library
//!
//! Loads a trained credit-default model and its preprocessing pipeline,
//! validates applicant records against a strict schema, scores them, guards
//! the model output and turns per-feature attributions into plain-language
//! explanations.

pub mod config;
pub mod consumer;
pub mod error;
pub mod explain;
pub mod feature_extractor;
pub mod input_safety;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod schema;
pub mod service;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use consumer::ApplicationConsumer;
pub use error::ScoringError;
pub use explain::{ExplanationEngine, ExplanationResult};
pub use feature_extractor::FeatureExtractor;
pub use models::InferenceEngine;
pub use producer::AssessmentProducer;
pub use service::{CreditApplication, ScoringService};
pub use types::{ApplicantRequest, CreditAssessment, PredictionResult, RiskBand};
