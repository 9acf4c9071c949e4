//! Explanation engine: turns per-feature attributions into ranked,
//! human-readable "what helped / what hurt" narratives.
//!
//! Sign convention: a negative attribution lowers the predicted default risk
//! and is therefore a *positive* impact for the applicant; a positive
//! attribution is a negative impact.

pub mod narrative;

use crate::error::ExplanationError;
use crate::types::assessment::RiskBand;
use crate::types::record::{FeatureRow, FeatureValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use narrative::DISCLAIMER;

/// Number of contributions kept per impact direction
pub const TOP_K: usize = 3;

/// Direction of a feature's effect, from the applicant's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
}

impl Impact {
    pub fn from_attribution(value: f64) -> Self {
        if value < 0.0 {
            Impact::Positive
        } else {
            Impact::Negative
        }
    }
}

/// Relative size of an attribution within its own request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Magnitude {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature_name: String,
    pub human_name: String,
    pub attribution: f64,
    pub feature_value: FeatureValue,
    pub impact: Impact,
    pub magnitude: Magnitude,
    pub explanation: String,
}

/// Complete explanation package for one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub top_positive_features: Vec<FeatureContribution>,
    pub top_negative_features: Vec<FeatureContribution>,
    pub risk_band: RiskBand,
    pub risk_band_label: String,
    pub risk_band_description: String,
    pub risk_band_color: String,
    pub what_helped: Vec<String>,
    pub what_hurt: Vec<String>,
    pub how_to_improve: Vec<String>,
    pub disclaimer: String,
}

/// Median and upper quartile of the absolute attributions of one request
#[derive(Debug, Clone, Copy)]
struct MagnitudeCutoffs {
    p50: f64,
    p75: f64,
}

impl MagnitudeCutoffs {
    fn from_attributions(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().map(|v| v.abs()).collect();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            p50: percentile(&sorted, 50.0)?,
            p75: percentile(&sorted, 75.0)?,
        })
    }

    fn categorize(&self, value: f64) -> Magnitude {
        let magnitude = value.abs();
        if magnitude >= self.p75 {
            Magnitude::High
        } else if magnitude >= self.p50 {
            Magnitude::Medium
        } else {
            Magnitude::Low
        }
    }
}

/// Percentile of an ascending slice with linear interpolation between
/// closest ranks. `None` for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (q / 100.0).clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Stateless explanation generator; one instance can serve all requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationEngine;

impl ExplanationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Magnitude of one attribution relative to the whole vector
    pub fn categorize_magnitude(&self, value: f64, all: &[f64]) -> Magnitude {
        MagnitudeCutoffs::from_attributions(all)
            .map(|cutoffs| cutoffs.categorize(value))
            .unwrap_or(Magnitude::High)
    }

    /// Explain one prediction.
    ///
    /// `attributions` and `feature_names` are parallel. `feature_values` holds
    /// the applicant's prepared row; features absent from it render as `N/A`.
    pub fn explain<S: AsRef<str>>(
        &self,
        attributions: &[f64],
        feature_names: &[S],
        feature_values: &FeatureRow,
        probability: f64,
    ) -> Result<ExplanationResult, ExplanationError> {
        if !(probability.is_finite() && (0.0..=1.0).contains(&probability)) {
            return Err(ExplanationError::InvalidProbability(probability));
        }
        if attributions.len() != feature_names.len() {
            return Err(ExplanationError::LengthMismatch {
                values: attributions.len(),
                names: feature_names.len(),
            });
        }
        if let Some(i) = attributions.iter().position(|v| !v.is_finite()) {
            return Err(ExplanationError::NonFiniteAttribution {
                feature: feature_names[i].as_ref().to_string(),
            });
        }

        let band = RiskBand::from_probability(probability);

        let mut order: Vec<usize> = (0..attributions.len()).collect();
        // stable: equal magnitudes keep their input order
        order.sort_by(|&a, &b| attributions[b].abs().total_cmp(&attributions[a].abs()));

        let mut positive = Vec::new();
        let mut negative = Vec::new();

        if let Some(cutoffs) = MagnitudeCutoffs::from_attributions(attributions) {
            for index in order {
                let impact = Impact::from_attribution(attributions[index]);
                let bucket = match impact {
                    Impact::Positive => &mut positive,
                    Impact::Negative => &mut negative,
                };
                if bucket.len() == TOP_K {
                    continue;
                }
                bucket.push(self.contribution(
                    feature_names[index].as_ref(),
                    attributions[index],
                    impact,
                    cutoffs.categorize(attributions[index]),
                    feature_values,
                ));
            }
        }

        let what_helped = narratives(&positive, narrative::FALLBACK_HELPED);
        let what_hurt = narratives(&negative, narrative::FALLBACK_HURT);
        // nothing to explain: fixed fallbacks regardless of band
        let mut how_to_improve = if attributions.is_empty() {
            Vec::new()
        } else {
            let names = negative.iter().map(|c| c.feature_name.as_str());
            narrative::improvement_suggestions(names, band)
        };
        if how_to_improve.is_empty() {
            how_to_improve.push(narrative::FALLBACK_IMPROVE.to_string());
        }

        debug!(
            risk_band = band.as_str(),
            features = attributions.len(),
            positive = positive.len(),
            negative = negative.len(),
            "Explanation generated"
        );

        Ok(ExplanationResult {
            top_positive_features: positive,
            top_negative_features: negative,
            risk_band: band,
            risk_band_label: band.label().to_string(),
            risk_band_description: band.description().to_string(),
            risk_band_color: band.color().to_string(),
            what_helped,
            what_hurt,
            how_to_improve,
            disclaimer: DISCLAIMER.to_string(),
        })
    }

    fn contribution(
        &self,
        feature: &str,
        attribution: f64,
        impact: Impact,
        magnitude: Magnitude,
        feature_values: &FeatureRow,
    ) -> FeatureContribution {
        let value = feature_values.get(feature).cloned().unwrap_or(FeatureValue::Null);
        FeatureContribution {
            feature_name: feature.to_string(),
            human_name: narrative::human_name(feature).to_string(),
            attribution,
            explanation: narrative::feature_explanation(feature, &value, impact),
            feature_value: value,
            impact,
            magnitude,
        }
    }
}

fn narratives(contributions: &[FeatureContribution], fallback: &str) -> Vec<String> {
    if contributions.is_empty() {
        vec![fallback.to_string()]
    } else {
        contributions.iter().map(|c| c.explanation.clone()).collect()
    }
}
