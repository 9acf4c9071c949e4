//! Feature names, explanation templates and improvement suggestions

use super::Impact;
use crate::types::assessment::RiskBand;
use crate::types::record::FeatureValue;

/// Advisory statement attached to every explanation
pub const DISCLAIMER: &str = "This assessment is advisory and does not constitute financial advice. \
Final lending decisions should consider additional factors and comply with applicable regulations.";

pub const FALLBACK_HELPED: &str = "Overall financial profile is stable";
pub const FALLBACK_HURT: &str = "No significant risk factors identified";
pub const FALLBACK_IMPROVE: &str = "Maintain current financial practices";

const MAX_SUGGESTIONS: usize = 3;

/// Display name for a feature; unmapped names are returned as-is
pub fn human_name(feature: &str) -> &str {
    match feature {
        "annual_income" => "Annual Income",
        "monthly_debt" => "Monthly Debt Payments",
        "credit_score" => "Credit Score",
        "loan_amount" => "Requested Loan Amount",
        "loan_term_months" => "Loan Term Length",
        "employment_length_years" => "Employment History",
        "home_ownership" => "Home Ownership Status",
        "purpose" => "Loan Purpose",
        "number_of_open_accounts" => "Number of Open Accounts",
        "delinquencies_2y" => "Recent Delinquencies",
        "inquiries_6m" => "Recent Credit Inquiries",
        "debt_to_income_ratio" => "Debt-to-Income Ratio",
        other => other,
    }
}

/// One sentence describing how a feature moved the assessment.
///
/// Templates that need a number fall back to the generic sentence when the
/// value is missing or not numeric.
pub fn feature_explanation(feature: &str, value: &FeatureValue, impact: Impact) -> String {
    templated(feature, value, impact).unwrap_or_else(|| generic(feature, impact))
}

fn generic(feature: &str, impact: Impact) -> String {
    let direction = match impact {
        Impact::Positive => "positively",
        Impact::Negative => "negatively",
    };
    format!("{} contributes {} to risk assessment", human_name(feature), direction)
}

fn templated(feature: &str, value: &FeatureValue, impact: Impact) -> Option<String> {
    let number = value.as_f64().filter(|v| v.is_finite())?;
    let positive = impact == Impact::Positive;

    let sentence = match feature {
        "credit_score" if positive => {
            if number >= 750.0 {
                format!("Excellent credit score ({}) demonstrates strong repayment history", value)
            } else if number >= 700.0 {
                format!("Good credit score ({}) indicates reliable financial behavior", value)
            } else {
                format!("Credit score ({}) shows acceptable credit history", value)
            }
        }
        "credit_score" => {
            if number < 600.0 {
                format!("Low credit score ({}) raises concerns about repayment ability", value)
            } else {
                format!("Credit score ({}) below ideal threshold increases risk", value)
            }
        }
        "annual_income" if positive => format!(
            "Strong annual income ({}) supports loan repayment capacity",
            format_currency(number)
        ),
        "annual_income" => format!(
            "Annual income ({}) may limit repayment flexibility",
            format_currency(number)
        ),
        "monthly_debt" if positive => format!(
            "Manageable monthly debt ({}) indicates good debt control",
            format_currency(number)
        ),
        "monthly_debt" => format!(
            "Monthly debt obligations ({}) add financial strain",
            format_currency(number)
        ),
        "loan_amount" if positive => format!(
            "Modest loan amount ({}) reduces overall risk",
            format_currency(number)
        ),
        "loan_amount" => format!(
            "Large loan amount ({}) increases default risk exposure",
            format_currency(number)
        ),
        "employment_length_years" if positive => {
            format!("Stable employment ({} years) demonstrates job security", value)
        }
        "employment_length_years" => {
            format!("Limited employment history ({} years) raises stability concerns", value)
        }
        // count-based templates ignore the impact direction
        "delinquencies_2y" => {
            if number > 0.0 {
                format!("{} recent delinquencies indicate payment difficulties", value)
            } else {
                "No recent delinquencies show consistent payment behavior".to_string()
            }
        }
        "inquiries_6m" => {
            if number > 3.0 {
                format!("{} recent credit inquiries suggest financial stress", value)
            } else {
                format!("Few credit inquiries ({}) indicate stable credit usage", value)
            }
        }
        "number_of_open_accounts" if positive => {
            format!("Healthy number of accounts ({}) shows credit experience", value)
        }
        "number_of_open_accounts" => {
            format!("High number of accounts ({}) may indicate overextension", value)
        }
        _ => return None,
    };

    Some(sentence)
}

fn suggestion_for(feature: &str) -> Option<&'static str> {
    match feature {
        "credit_score" => {
            Some("Improve credit score by making on-time payments and reducing credit utilization")
        }
        "monthly_debt" => Some("Reduce monthly debt obligations to improve debt-to-income ratio"),
        "delinquencies_2y" => {
            Some("Maintain consistent payment history to reduce delinquency impact over time")
        }
        "inquiries_6m" => Some("Limit new credit applications to reduce hard inquiry impact"),
        "employment_length_years" => {
            Some("Build employment stability to strengthen overall financial profile")
        }
        "loan_amount" => Some("Consider requesting a smaller loan amount to reduce risk exposure"),
        _ => None,
    }
}

/// Suggestions from the negative-impact features, at most three.
///
/// With no mapped feature the medium and high bands get a generic line; the
/// low band gets nothing and the caller substitutes its fallback.
pub fn improvement_suggestions<'a>(
    negative_features: impl IntoIterator<Item = &'a str>,
    band: RiskBand,
) -> Vec<String> {
    let mut suggestions: Vec<String> = negative_features
        .into_iter()
        .filter_map(suggestion_for)
        .map(str::to_string)
        .collect();

    if suggestions.is_empty() {
        match band {
            RiskBand::Medium => suggestions.push(
                "Continue maintaining current financial behaviors to strengthen profile".into(),
            ),
            RiskBand::High => suggestions
                .push("Focus on building emergency savings and reducing debt burden".to_string()),
            RiskBand::Low => {}
        }
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Whole-dollar amount with thousands separators, e.g. `$85,000`
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
