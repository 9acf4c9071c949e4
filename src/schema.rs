//! Strict input schema validation.
//!
//! The prepared row must hold exactly the 12 expected columns with the right
//! kinds of values. Runs on every prediction; nothing is cached.

use crate::error::SchemaValidationError;
use crate::types::record::FeatureRow;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Derived column computed from income and debt
pub const DTI_COLUMN: &str = "debt_to_income_ratio";

/// The 11 raw applicant attributes, in training order
pub const RAW_INPUT_COLUMNS: [&str; 11] = [
    "annual_income",
    "monthly_debt",
    "credit_score",
    "loan_amount",
    "loan_term_months",
    "employment_length_years",
    "home_ownership",
    "purpose",
    "number_of_open_accounts",
    "delinquencies_2y",
    "inquiries_6m",
];

/// Columns that must hold numbers
pub const NUMERIC_COLUMNS: [&str; 10] = [
    "annual_income",
    "monthly_debt",
    "credit_score",
    "loan_amount",
    "loan_term_months",
    "employment_length_years",
    "number_of_open_accounts",
    "delinquencies_2y",
    "inquiries_6m",
    DTI_COLUMN,
];

/// Columns that must hold text
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["home_ownership", "purpose"];

pub const EXPECTED_COLUMN_COUNT: usize = RAW_INPUT_COLUMNS.len() + 1;

/// Full expected column set, sorted
pub fn expected_columns() -> BTreeSet<&'static str> {
    RAW_INPUT_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(DTI_COLUMN))
        .collect()
}

/// Validate a prepared row against the fixed 12-column schema.
///
/// Column presence is checked first: missing and extra columns are reported
/// together. Type checks then collect every mismatch before failing.
pub fn validate_row(row: &FeatureRow) -> Result<(), SchemaValidationError> {
    let expected = expected_columns();
    let present: BTreeSet<&str> = row.column_names().collect();

    let missing: Vec<String> = expected.difference(&present).map(|c| c.to_string()).collect();
    let extra: Vec<String> = present.difference(&expected).map(|c| c.to_string()).collect();

    if !missing.is_empty() || !extra.is_empty() {
        warn!(missing = ?missing, extra = ?extra, "Input schema validation failed");
        return Err(SchemaValidationError::Columns {
            missing,
            extra,
            expected: expected.iter().map(|c| c.to_string()).collect(),
        });
    }

    let mut type_errors = Vec::new();

    for column in NUMERIC_COLUMNS {
        if let Some(value) = row.get(column) {
            if !value.is_numeric() {
                type_errors.push(format!(
                    "Column '{}' must be numeric, got {}",
                    column,
                    value.type_name()
                ));
            }
        }
    }

    for column in CATEGORICAL_COLUMNS {
        if let Some(value) = row.get(column) {
            if !value.is_text() {
                type_errors.push(format!(
                    "Column '{}' must be string, got {}",
                    column,
                    value.type_name()
                ));
            }
        }
    }

    if !type_errors.is_empty() {
        warn!(errors = type_errors.len(), "Input data type validation failed");
        return Err(SchemaValidationError::Types(type_errors));
    }

    debug!("Input schema validation passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FeatureExtractor;
    use crate::test_support::sample_applicant;
    use crate::types::record::FeatureValue;

    fn valid_row() -> FeatureRow {
        FeatureExtractor::new().extract(&sample_applicant())
    }

    #[test]
    fn test_valid_row_passes() {
        assert!(validate_row(&valid_row()).is_ok());
    }

    #[test]
    fn test_missing_and_extra_reported_together() {
        let mut row = valid_row();
        row.remove("credit_score");
        row.insert("extra_field", 1.0);

        match validate_row(&row) {
            Err(SchemaValidationError::Columns { missing, extra, expected }) => {
                assert_eq!(missing, vec!["credit_score".to_string()]);
                assert_eq!(extra, vec!["extra_field".to_string()]);
                assert_eq!(expected.len(), 12);
                assert!(expected.contains(&"credit_score".to_string()));
            }
            other => panic!("expected column error, got {:?}", other),
        }
    }

    #[test]
    fn test_column_lists_are_sorted() {
        let mut row = valid_row();
        row.remove("purpose");
        row.remove("annual_income");
        row.insert("zeta", 1.0);
        row.insert("alpha", 1.0);

        let err = validate_row(&row).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Missing required columns: [annual_income, purpose]"));
        assert!(msg.contains("Unexpected columns found: [alpha, zeta]"));
    }

    #[test]
    fn test_all_type_errors_collected() {
        let mut row = valid_row();
        row.insert("credit_score", "seven hundred");
        row.insert("loan_amount", FeatureValue::Null);
        row.insert("purpose", 3_i64);

        match validate_row(&row) {
            Err(SchemaValidationError::Types(errors)) => {
                assert_eq!(errors.len(), 3);
                let has = |text: &str| errors.iter().any(|e| e.contains(text));
                assert!(has("'credit_score' must be numeric, got str"));
                assert!(has("'loan_amount' must be numeric, got null"));
                assert!(errors.iter().any(|e| e.contains("'purpose' must be string, got int")));
            }
            other => panic!("expected type error, got {:?}", other),
        }
    }

    #[test]
    fn test_bool_is_not_numeric() {
        let mut row = valid_row();
        row.insert("delinquencies_2y", FeatureValue::Bool(false));
        assert!(matches!(validate_row(&row), Err(SchemaValidationError::Types(_))));
    }
}
