//! Shared fixtures for unit tests

use crate::input_safety::{HOME_OWNERSHIP_VALUES, PURPOSE_VALUES};
use crate::schema::{DTI_COLUMN, EXPECTED_COLUMN_COUNT, NUMERIC_COLUMNS, RAW_INPUT_COLUMNS};
use crate::types::ApplicantRequest;
use serde_json::{json, Value};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A low-risk, fully valid applicant
pub fn sample_applicant() -> ApplicantRequest {
    ApplicantRequest {
        annual_income: 60_000.0,
        monthly_debt: 1_500.0,
        credit_score: 710,
        loan_amount: 15_000.0,
        loan_term_months: 36,
        employment_length_years: 4.0,
        home_ownership: "RENT".to_string(),
        purpose: "debt_consolidation".to_string(),
        number_of_open_accounts: 5,
        delinquencies_2y: 0,
        inquiries_6m: 1,
    }
}

/// Applicant as the untyped JSON object carried by a credit application
pub fn sample_applicant_json() -> serde_json::Map<String, Value> {
    match serde_json::to_value(sample_applicant()) {
        Ok(Value::Object(map)) => map,
        _ => unreachable!("applicant serializes to an object"),
    }
}

pub fn feature_names() -> Vec<String> {
    RAW_INPUT_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(DTI_COLUMN))
        .map(str::to_string)
        .collect()
}

/// Width of the fixture preprocessor's output
pub const TRANSFORMED_WIDTH: usize =
    NUMERIC_COLUMNS.len() + HOME_OWNERSHIP_VALUES.len() + PURPOSE_VALUES.len();

pub fn legacy_preprocessor() -> Value {
    let stats = |column: &str| match column {
        "annual_income" => (55_000.0, 60_000.0, 25_000.0),
        "monthly_debt" => (1_200.0, 1_300.0, 700.0),
        "credit_score" => (690.0, 680.0, 60.0),
        "loan_amount" => (12_000.0, 14_000.0, 8_000.0),
        "loan_term_months" => (36.0, 42.0, 12.0),
        "employment_length_years" => (4.0, 5.0, 4.0),
        "number_of_open_accounts" => (5.0, 6.0, 3.0),
        "delinquencies_2y" => (0.0, 0.4, 0.8),
        "inquiries_6m" => (1.0, 1.5, 1.5),
        _ => (0.25, 0.3, 0.15),
    };

    let numeric: Vec<Value> = NUMERIC_COLUMNS
        .iter()
        .map(|&column| {
            let (median, mean, scale) = stats(column);
            json!({ "column": column, "median": median, "mean": mean, "scale": scale })
        })
        .collect();

    json!({
        "numeric": numeric,
        "categorical": [
            { "column": "home_ownership", "categories": HOME_OWNERSHIP_VALUES },
            { "column": "purpose", "categories": PURPOSE_VALUES }
        ]
    })
}

pub fn modern_preprocessor() -> Value {
    json!({
        "pipeline": legacy_preprocessor(),
        "feature_names": feature_names(),
        "schema_version": "v1"
    })
}

/// Logistic regression driven by credit score, delinquencies and DTI
pub fn legacy_model() -> Value {
    let mut coefficients = vec![0.0; TRANSFORMED_WIDTH];
    coefficients[2] = -0.9; // credit_score
    coefficients[7] = 0.8; // delinquencies_2y
    coefficients[9] = 0.6; // debt_to_income_ratio
    json!({
        "type": "logistic_regression",
        "coefficients": coefficients,
        "intercept": -1.2
    })
}

pub fn modern_model() -> Value {
    json!({
        "model": legacy_model(),
        "feature_names": feature_names(),
        "schema_version": "v1",
        "model_name": "credit_risk_logreg",
        "model_class": "LogisticRegression",
        "metrics": { "roc_auc": 0.78, "pr_auc": 0.41, "coef": 1.0 },
        "metadata": {
            "training_timestamp": "2024-06-01T12:00:00Z",
            "feature_count": EXPECTED_COLUMN_COUNT
        }
    })
}

/// Linear SVC over the same inputs; has no probability output
pub fn svc_model() -> Value {
    let mut coefficients = vec![0.0; TRANSFORMED_WIDTH];
    coefficients[2] = -1.0;
    json!({
        "model": { "type": "linear_svc", "coefficients": coefficients, "intercept": -0.5 },
        "feature_names": feature_names(),
        "schema_version": "v1"
    })
}

pub fn write_json(dir: &Path, name: &str, value: &Value) {
    std::fs::write(dir.join(name), serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

pub fn write_artifacts(dir: &Path, model: &Value, preprocessor: &Value) {
    write_json(dir, "model.json", model);
    write_json(dir, "preprocessor.json", preprocessor);
}

/// Shared buffer the test subscriber writes formatted events into
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return what it logged
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}
