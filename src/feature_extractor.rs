//! Feature extraction for credit risk model inference.
//!
//! Builds the prepared 12-column row (11 raw attributes plus the derived
//! debt-to-income ratio) that the schema validator and preprocessor consume.

use crate::schema::{self, DTI_COLUMN};
use crate::types::applicant::{debt_to_income, ApplicantRequest};
use crate::types::record::{FeatureRow, FeatureValue};
use serde_json::{Map, Value};
use tracing::debug;

/// Feature extractor that turns applicant payloads into prepared rows.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the prepared row from a typed request.
    pub fn extract(&self, request: &ApplicantRequest) -> FeatureRow {
        let mut row = FeatureRow::new()
            .with("annual_income", request.annual_income)
            .with("monthly_debt", request.monthly_debt)
            .with("credit_score", request.credit_score)
            .with("loan_amount", request.loan_amount)
            .with("loan_term_months", request.loan_term_months)
            .with("employment_length_years", request.employment_length_years)
            .with("home_ownership", normalize_home_ownership(&request.home_ownership))
            .with("purpose", normalize_purpose(&request.purpose))
            .with("number_of_open_accounts", request.number_of_open_accounts)
            .with("delinquencies_2y", request.delinquencies_2y)
            .with("inquiries_6m", request.inquiries_6m);

        // non-positive income leaves a NaN for the input safety checks to report
        row.insert(DTI_COLUMN, request.debt_to_income_ratio().unwrap_or(f64::NAN));
        row
    }

    /// Extract the prepared row from an untyped JSON object.
    ///
    /// Every key is carried over so that the schema validator can report
    /// unexpected columns. A caller-supplied debt-to-income ratio is replaced
    /// by the computed one. When income or debt is missing or non-numeric the
    /// ratio is NaN, so validation reports the offending input column instead.
    pub fn extract_json(&self, applicant: &Map<String, Value>) -> FeatureRow {
        let mut row = FeatureRow::new();

        for (column, value) in applicant {
            let cell = FeatureValue::from_json(value).unwrap_or(FeatureValue::Null);
            let cell = match (column.as_str(), cell) {
                ("home_ownership", FeatureValue::Text(s)) => {
                    FeatureValue::Text(normalize_home_ownership(&s))
                }
                ("purpose", FeatureValue::Text(s)) => FeatureValue::Text(normalize_purpose(&s)),
                (_, cell) => cell,
            };
            row.insert(column.clone(), cell);
        }

        if row.remove(DTI_COLUMN).is_some() {
            debug!("Ignoring caller-supplied debt_to_income_ratio, recomputing");
        }

        let dti = match (row.number("annual_income"), row.number("monthly_debt")) {
            (Some(income), Some(debt)) => debt_to_income(income, debt).unwrap_or(f64::NAN),
            _ => f64::NAN,
        };
        row.insert(DTI_COLUMN, dti);

        row
    }

    /// Get the number of prepared columns.
    pub fn feature_count(&self) -> usize {
        schema::EXPECTED_COLUMN_COUNT
    }

    /// Get prepared column names (raw inputs first, derived column last).
    pub fn feature_names(&self) -> Vec<&'static str> {
        schema::RAW_INPUT_COLUMNS
            .iter()
            .copied()
            .chain(std::iter::once(DTI_COLUMN))
            .collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_home_ownership(value: &str) -> String {
    value.trim().to_uppercase()
}

fn normalize_purpose(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_applicant;
    use serde_json::json;

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::new();
        let row = extractor.extract(&sample_applicant());

        assert_eq!(row.len(), extractor.feature_count());
        assert_eq!(row.number("annual_income"), Some(60_000.0));
        assert_eq!(row.get("credit_score"), Some(&FeatureValue::Int(710)));
        assert!((row.number(DTI_COLUMN).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_categoricals_normalized() {
        let mut request = sample_applicant();
        request.home_ownership = " mortgage ".to_string();
        request.purpose = "Home_Improvement".to_string();

        let row = FeatureExtractor::new().extract(&request);
        assert_eq!(row.get("home_ownership").and_then(FeatureValue::as_str), Some("MORTGAGE"));
        assert_eq!(row.get("purpose").and_then(FeatureValue::as_str), Some("home_improvement"));
    }

    #[test]
    fn test_json_extraction_keeps_unknown_columns() {
        let payload = json!({
            "annual_income": 48000,
            "monthly_debt": 800.0,
            "extra_field": "x",
            "debt_to_income_ratio": 99.0
        });
        let row = FeatureExtractor::new().extract_json(payload.as_object().unwrap());

        assert!(row.contains("extra_field"));
        // 800 / (48000 / 12) = 0.2
        assert!((row.number(DTI_COLUMN).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_json_extraction_without_numeric_income_has_nan_dti() {
        for payload in [
            json!({ "monthly_debt": 800.0 }),
            json!({ "annual_income": "60000", "monthly_debt": 800.0 }),
        ] {
            let row = FeatureExtractor::new().extract_json(payload.as_object().unwrap());
            assert!(row.number(DTI_COLUMN).unwrap().is_nan());
        }
    }

    #[test]
    fn test_feature_names() {
        let extractor = FeatureExtractor::new();
        let names = extractor.feature_names();
        assert_eq!(names.len(), 12);
        assert_eq!(names.last(), Some(&"debt_to_income_ratio"));
    }
}
