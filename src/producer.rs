//! NATS message producer for assessments and scoring failures

use crate::types::assessment::{AssessmentFailure, CreditAssessment};
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Publishes scored assessments and sanitized failures on separate subjects
#[derive(Clone)]
pub struct AssessmentProducer {
    client: Client,
    assessment_subject: String,
    failure_subject: String,
}

impl AssessmentProducer {
    pub fn new(client: Client, assessment_subject: &str, failure_subject: &str) -> Self {
        Self {
            client,
            assessment_subject: assessment_subject.to_string(),
            failure_subject: failure_subject.to_string(),
        }
    }

    /// Publish a scored assessment
    pub async fn publish(&self, assessment: &CreditAssessment) -> Result<()> {
        let payload = serde_json::to_vec(assessment)?;

        self.client
            .publish(self.assessment_subject.clone(), payload.into())
            .await?;

        debug!(
            assessment_id = %assessment.assessment_id,
            application_id = %assessment.application_id,
            probability = assessment.prediction.probability,
            "Published credit assessment"
        );

        Ok(())
    }

    /// Publish a failure record; only the public message goes on the wire
    pub async fn publish_failure(&self, failure: &AssessmentFailure) -> Result<()> {
        let payload = serde_json::to_vec(failure)?;

        self.client
            .publish(self.failure_subject.clone(), payload.into())
            .await?;

        debug!(
            application_id = %failure.application_id,
            code = %failure.code,
            "Published assessment failure"
        );

        Ok(())
    }

    pub fn assessment_subject(&self) -> &str {
        &self.assessment_subject
    }

    pub fn failure_subject(&self) -> &str {
        &self.failure_subject
    }
}
