//! Test Application Producer
//!
//! Generates and publishes synthetic credit applications to NATS for
//! exercising the scoring service.
//!
//! Usage: test_producer [nats_url] [subject] [count] [risky_rate] [delay_ms]

use credit_risk_scoring::input_safety::PURPOSE_VALUES;
use credit_risk_scoring::service::{Attributions, CreditApplication};
use credit_risk_scoring::types::ApplicantRequest;
use credit_risk_scoring::FeatureExtractor;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Synthetic applicant generator
struct ApplicationGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
    feature_names: Vec<String>,
}

impl ApplicationGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
            feature_names: FeatureExtractor::new()
                .feature_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Applicant with a solid profile
    fn generate_strong(&mut self) -> ApplicantRequest {
        let annual_income = self.rng.gen_range(60_000.0..180_000.0_f64).round();
        ApplicantRequest {
            annual_income,
            monthly_debt: (annual_income / 12.0 * self.rng.gen_range(0.05..0.25)).round(),
            credit_score: self.rng.gen_range(700..850),
            loan_amount: self.rng.gen_range(5_000.0..40_000.0_f64).round(),
            loan_term_months: self.random_choice(&[36, 48, 60]),
            employment_length_years: self.rng.gen_range(3..25) as f64,
            home_ownership: self.random_choice(&["OWN", "MORTGAGE"]).to_string(),
            purpose: self.random_choice(&["home_improvement", "major_purchase", "car"]).to_string(),
            number_of_open_accounts: self.rng.gen_range(3..12),
            delinquencies_2y: 0,
            inquiries_6m: self.rng.gen_range(0..2),
        }
    }

    /// Applicant with several risk factors
    fn generate_risky(&mut self) -> ApplicantRequest {
        let annual_income = self.rng.gen_range(18_000.0..45_000.0_f64).round();
        ApplicantRequest {
            annual_income,
            monthly_debt: (annual_income / 12.0 * self.rng.gen_range(0.4..0.9)).round(),
            credit_score: self.rng.gen_range(480..640),
            loan_amount: self.rng.gen_range(20_000.0..80_000.0_f64).round(),
            loan_term_months: self.random_choice(&[12, 24, 36]),
            employment_length_years: self.rng.gen_range(0..3) as f64,
            home_ownership: self.random_choice(&["RENT", "OTHER"]).to_string(),
            purpose: self.random_choice(&PURPOSE_VALUES).to_string(),
            number_of_open_accounts: self.rng.gen_range(8..25),
            delinquencies_2y: self.rng.gen_range(1..6),
            inquiries_6m: self.rng.gen_range(3..9),
        }
    }

    /// Wrap an applicant with synthetic attributions over every input column
    fn application(&mut self, applicant: &ApplicantRequest) -> anyhow::Result<CreditApplication> {
        self.counter += 1;

        let applicant = match serde_json::to_value(applicant)? {
            Value::Object(map) => map,
            other => anyhow::bail!("applicant serialized to {}", other),
        };

        let values = (0..self.feature_names.len())
            .map(|_| self.rng.gen_range(-0.5..0.5))
            .collect();

        Ok(CreditApplication {
            application_id: format!("app_{:012}", self.counter),
            applicant,
            attributions: Some(Attributions {
                feature_names: self.feature_names.clone(),
                values,
            }),
        })
    }

    fn next(&mut self, risky_rate: f64) -> anyhow::Result<(CreditApplication, bool)> {
        let risky = self.rng.gen_bool(risky_rate);
        let applicant = if risky {
            self.generate_risky()
        } else {
            self.generate_strong()
        };
        Ok((self.application(&applicant)?, risky))
    }

    fn random_choice<T: Copy>(&mut self, choices: &[T]) -> T {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Application Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("credit.applications");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let risky_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.3_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        risky_rate = risky_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, risky_rate, delay_ms).await;
        }
    };

    let mut generator = ApplicationGenerator::new();
    let mut strong_count = 0;
    let mut risky_count = 0;

    for i in 0..count {
        let (application, risky) = generator.next(risky_rate)?;
        if risky {
            risky_count += 1;
        } else {
            strong_count += 1;
        }

        let payload = serde_json::to_vec(&application)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} applications ({} strong, {} risky)",
                i + 1,
                count,
                strong_count,
                risky_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    // make sure everything is on the wire before exiting
    client.flush().await?;

    info!(
        "Completed! Published {} applications ({} strong, {} risky)",
        count, strong_count, risky_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, risky_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = ApplicationGenerator::new();

    for i in 0..count {
        let (application, _) = generator.next(risky_rate)?;

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string_pretty(&application)?;
            info!("Sample application {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
