//! Credit Risk Scoring Service - Main Entry Point
//!
//! Consumes credit applications from NATS, scores and explains them, and
//! publishes assessments (or sanitized failures). Applications are processed
//! concurrently against one shared, loaded inference engine.

use anyhow::{Context, Result};
use credit_risk_scoring::{
    config::{AppConfig, LoggingConfig},
    consumer::ApplicationConsumer,
    metrics::{MetricsReporter, ScoringMetrics},
    models::InferenceEngine,
    producer::AssessmentProducer,
    service::{CreditApplication, ScoringService},
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("credit_risk_scoring={}", logging.level)))
        .context("Invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::load()?,
    };

    init_logging(&config.logging)?;
    info!("Starting Credit Risk Scoring Service");

    // Load artifacts once; every task shares this engine
    let engine = Arc::new(
        InferenceEngine::new(&config.models).context("Failed to load model artifacts")?,
    );
    let model_info = engine.model_info();
    info!(
        model_id = %model_info.model_id,
        model_type = %model_info.metadata.model_type,
        schema_version = %model_info.metadata.schema_version,
        "Inference engine ready"
    );

    let service = ScoringService::new(engine);
    let metrics = Arc::new(ScoringMetrics::new());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!(url = %config.nats.url, "Connected to NATS");

    let consumer = ApplicationConsumer::new(client.clone(), &config.nats.application_subject);
    let producer = AssessmentProducer::new(
        client.clone(),
        &config.nats.assessment_subject,
        &config.nats.failure_subject,
    );

    let workers = config.pipeline.workers;
    info!(
        workers = workers,
        applications = %consumer.subject(),
        assessments = %producer.assessment_subject(),
        failures = %producer.failure_subject(),
        "Starting application processing loop"
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(workers));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let service = service.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let application = match serde_json::from_slice::<CreditApplication>(&message.payload) {
                Ok(application) => application,
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize credit application");
                    metrics.record_failure(start_time.elapsed(), "INVALID_MESSAGE");
                    return;
                }
            };

            match service.assess(&application) {
                Ok(assessment) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_assessment(
                        processing_time,
                        assessment.prediction.probability,
                        assessment.risk_band,
                    );

                    match producer.publish(&assessment).await {
                        Ok(()) => info!(
                            application_id = %assessment.application_id,
                            assessment_id = %assessment.assessment_id,
                            probability = assessment.prediction.probability,
                            risk_band = assessment.risk_band.as_str(),
                            processing_time_us = processing_time.as_micros() as u64,
                            "Credit assessment published"
                        ),
                        Err(e) => error!(
                            application_id = %assessment.application_id,
                            error = %e,
                            "Failed to publish credit assessment"
                        ),
                    }
                }
                Err(err) => {
                    let failure = ScoringService::failure(&application.application_id, &err);
                    metrics.record_failure(start_time.elapsed(), &failure.code);

                    if let Err(e) = producer.publish_failure(&failure).await {
                        error!(
                            application_id = %application.application_id,
                            error = %e,
                            "Failed to publish assessment failure"
                        );
                    }
                }
            }

            drop(permit);
        });
    }

    info!("Subscription closed, shutting down");
    metrics.print_summary();

    Ok(())
}
