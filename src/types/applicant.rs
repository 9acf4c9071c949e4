//! Loan applicant data structures

use serde::{Deserialize, Serialize};

/// Raw applicant attributes as supplied by a caller.
///
/// The debt-to-income ratio is not part of the request; it is derived from
/// `annual_income` and `monthly_debt` during feature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicantRequest {
    /// Annual income in USD
    pub annual_income: f64,

    /// Total monthly debt payments in USD
    pub monthly_debt: f64,

    /// FICO credit score (300-850)
    pub credit_score: i64,

    /// Requested loan amount in USD
    pub loan_amount: f64,

    /// Loan term in months
    pub loan_term_months: i64,

    /// Years at current job
    pub employment_length_years: f64,

    /// RENT, OWN, MORTGAGE or OTHER (case-insensitive)
    pub home_ownership: String,

    /// Loan purpose category (case-insensitive)
    pub purpose: String,

    /// Open credit accounts
    pub number_of_open_accounts: i64,

    /// 30+ day delinquencies in the past 2 years
    pub delinquencies_2y: i64,

    /// Hard credit inquiries in the last 6 months
    pub inquiries_6m: i64,
}

impl ApplicantRequest {
    /// Monthly debt over monthly income, or `None` when income is not positive
    pub fn debt_to_income_ratio(&self) -> Option<f64> {
        debt_to_income(self.annual_income, self.monthly_debt)
    }
}

/// `monthly_debt / (annual_income / 12)`
pub fn debt_to_income(annual_income: f64, monthly_debt: f64) -> Option<f64> {
    if annual_income > 0.0 {
        Some(monthly_debt / (annual_income / 12.0))
    } else {
        None
    }
}
