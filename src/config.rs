//! Configuration management for the credit risk scoring service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Configuration file read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `CREDIT_RISK__MODELS__ARTIFACTS_DIR`
pub const ENV_PREFIX: &str = "CREDIT_RISK";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming credit applications
    pub application_subject: String,
    /// Subject for scored assessments
    pub assessment_subject: String,
    /// Subject for applications that could not be scored
    pub failure_subject: String,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory holding the model and preprocessor artifacts
    pub artifacts_dir: String,
    /// Identifier reported with every assessment and by the model info query
    pub model_id: String,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default = "default_preprocessor_file")]
    pub preprocessor_file: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_file() -> String {
    "model.json".to_string()
}

fn default_preprocessor_file() -> String {
    "preprocessor.json".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum applications scored concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load configuration from {}", DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from a specific path, with environment overrides on top
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be at least 1");
        }
        if self.pipeline.metrics_interval_secs == 0 {
            anyhow::bail!("pipeline.metrics_interval_secs must be at least 1");
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            anyhow::bail!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            );
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                application_subject: "credit.applications".to_string(),
                assessment_subject: "credit.assessments".to_string(),
                failure_subject: "credit.assessments.failed".to_string(),
            },
            models: ModelsConfig {
                artifacts_dir: "models".to_string(),
                model_id: "credit_risk_v1".to_string(),
                model_file: default_model_file(),
                preprocessor_file: default_preprocessor_file(),
                onnx_threads: 1,
            },
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: default_metrics_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
