//! Business-range and consistency checks applied after schema validation.
//!
//! All violations are collected and returned together.

use crate::schema::{DTI_COLUMN, NUMERIC_COLUMNS};
use crate::types::record::FeatureRow;
use tracing::warn;

/// Allowed `home_ownership` values (after upper-casing)
pub const HOME_OWNERSHIP_VALUES: [&str; 4] = ["RENT", "OWN", "MORTGAGE", "OTHER"];

/// Allowed `purpose` values (after lower-casing)
pub const PURPOSE_VALUES: [&str; 10] = [
    "debt_consolidation",
    "home_improvement",
    "major_purchase",
    "medical",
    "business",
    "car",
    "vacation",
    "wedding",
    "moving",
    "other",
];

/// Columns that must hold whole numbers
const INTEGER_COLUMNS: [&str; 5] = [
    "credit_score",
    "loan_term_months",
    "number_of_open_accounts",
    "delinquencies_2y",
    "inquiries_6m",
];

/// Inclusive bounds for columns with a plain `[min, max]` range
const RANGES: [(&str, f64, f64); 8] = [
    ("monthly_debt", 0.0, 100_000.0),
    ("credit_score", 300.0, 850.0),
    ("loan_term_months", 6.0, 360.0),
    ("employment_length_years", 0.0, 60.0),
    ("number_of_open_accounts", 0.0, 100.0),
    ("delinquencies_2y", 0.0, 50.0),
    ("inquiries_6m", 0.0, 50.0),
    (DTI_COLUMN, 0.0, 10.0),
];

/// Check a schema-valid row. Returns every violation found.
pub fn check_row(row: &FeatureRow) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for column in NUMERIC_COLUMNS {
        if let Some(value) = row.number(column) {
            if value.is_nan() {
                errors.push(format!(
                    "Field '{}' contains NaN (Not a Number). Please provide a valid numeric value.",
                    column
                ));
            } else if value.is_infinite() {
                errors.push(format!(
                    "Field '{}' contains Infinity. Please provide a finite numeric value.",
                    column
                ));
            }
        }
    }

    if let Some(income) = finite(row, "annual_income") {
        if income <= 0.0 {
            errors.push("annual_income must be positive".to_string());
        } else if income < 1_000.0 {
            errors.push("annual_income too low (minimum 1000)".to_string());
        } else if income > 10_000_000.0 {
            errors.push("annual_income exceeds maximum (10000000)".to_string());
        }
    }

    if let Some(amount) = finite(row, "loan_amount") {
        if amount <= 0.0 {
            errors.push("loan_amount must be positive".to_string());
        } else if amount > 1_000_000.0 {
            errors.push("loan_amount exceeds maximum (1000000)".to_string());
        }
    }

    for (column, min, max) in RANGES {
        if let Some(value) = finite(row, column) {
            if value < min {
                errors.push(format!("{} below minimum ({})", column, min));
            } else if value > max {
                errors.push(format!("{} exceeds maximum ({})", column, max));
            }
        }
    }

    for column in INTEGER_COLUMNS {
        if let Some(value) = finite(row, column) {
            if value.fract() != 0.0 {
                errors.push(format!("{} must be a whole number, got {}", column, value));
            }
        }
    }

    if let Some(home) = row.get("home_ownership").and_then(|v| v.as_str()) {
        if !HOME_OWNERSHIP_VALUES.contains(&home) {
            errors.push(format!(
                "home_ownership must be one of [{}], got '{}'",
                HOME_OWNERSHIP_VALUES.join(", "),
                home
            ));
        }
    }

    if let Some(purpose) = row.get("purpose").and_then(|v| v.as_str()) {
        if !PURPOSE_VALUES.contains(&purpose) {
            errors.push(format!(
                "purpose must be one of [{}], got '{}'",
                PURPOSE_VALUES.join(", "),
                purpose
            ));
        }
    }

    if let (Some(income), Some(debt)) =
        (finite(row, "annual_income"), finite(row, "monthly_debt"))
    {
        if debt * 12.0 > income * 10.0 {
            errors.push(
                "monthly_debt is unreasonably high compared to annual_income (exceeds 10x annual income)"
                    .to_string(),
            );
        }
    }

    if let (Some(loan), Some(income)) = (finite(row, "loan_amount"), finite(row, "annual_income")) {
        if income > 0.0 && loan / income > 100.0 {
            errors.push(
                "loan_amount is unreasonably high compared to annual_income (exceeds 100x annual income)"
                    .to_string(),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        warn!(
            error_count = errors.len(),
            first_errors = ?errors.iter().take(3).collect::<Vec<_>>(),
            "Input safety validation failed"
        );
        Err(errors)
    }
}

fn finite(row: &FeatureRow, column: &str) -> Option<f64> {
    row.number(column).filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FeatureExtractor;
    use crate::test_support::sample_applicant;

    fn row_with(edit: impl FnOnce(&mut crate::types::ApplicantRequest)) -> FeatureRow {
        let mut request = sample_applicant();
        edit(&mut request);
        FeatureExtractor::new().extract(&request)
    }

    #[test]
    fn test_sample_is_safe() {
        assert!(check_row(&row_with(|_| {})).is_ok());
    }

    #[test]
    fn test_collects_every_violation() {
        let row = row_with(|r| {
            r.credit_score = 200;
            r.home_ownership = "castle".to_string();
            r.inquiries_6m = -1;
        });
        let errors = check_row(&row).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("credit_score below minimum")));
        assert!(errors.iter().any(|e| e.contains("home_ownership must be one of")));
        assert!(errors.iter().any(|e| e.contains("inquiries_6m below minimum")));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let row = row_with(|r| r.employment_length_years = f64::INFINITY);
        let errors = check_row(&row).unwrap_err();
        assert!(errors[0].contains("'employment_length_years' contains Infinity"));
    }

    #[test]
    fn test_zero_income_rejected() {
        let row = row_with(|r| r.annual_income = 0.0);
        let errors = check_row(&row).unwrap_err();
        assert!(errors.iter().any(|e| e == "annual_income must be positive"));
        assert!(errors.iter().any(|e| e.contains("'debt_to_income_ratio' contains NaN")));
    }

    #[test]
    fn test_consistency_checks() {
        let row = row_with(|r| {
            r.annual_income = 2_000.0;
            r.monthly_debt = 5_000.0;
        });
        let errors = check_row(&row).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("exceeds 10x annual income")));
    }

    #[test]
    fn test_fractional_count_rejected() {
        let mut row = row_with(|_| {});
        row.insert("delinquencies_2y", 1.5);
        let errors = check_row(&row).unwrap_err();
        assert_eq!(errors, vec!["delinquencies_2y must be a whole number, got 1.5".to_string()]);
    }
}
