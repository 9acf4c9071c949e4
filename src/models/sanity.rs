//! Output sanity gate applied to every raw model result

use crate::error::IntegrityViolation;
use tracing::{debug, error, warn};

/// Valid but suspicious output, logged and passed through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeCase {
    /// Probability of exactly 0.0
    CertainNoDefault,
    /// Probability of exactly 1.0
    CertainDefault,
}

/// Check a raw `(label, probability)` pair.
///
/// Order matters: NaN before infinity before domain checks, so the most
/// specific violation is reported.
pub fn validate_outputs(
    label: f64,
    probability: f64,
) -> Result<Option<EdgeCase>, IntegrityViolation> {
    let edge = check(label, probability).map_err(|violation| {
        error!(
            label = label,
            probability = probability,
            violation = %violation,
            "prediction_sanity_check_failed"
        );
        violation
    })?;

    match edge {
        Some(edge) => warn!(
            probability = probability,
            label = label,
            edge_case = ?edge,
            "Model returned extreme probability, rare in real scenarios"
        ),
        None => debug!(label = label, probability = probability, "Prediction sanity checks passed"),
    }

    Ok(edge)
}

fn check(label: f64, probability: f64) -> Result<Option<EdgeCase>, IntegrityViolation> {
    if label.is_nan() {
        return Err(IntegrityViolation::LabelNaN);
    }
    if probability.is_nan() {
        return Err(IntegrityViolation::ProbabilityNaN);
    }
    if label.is_infinite() {
        return Err(IntegrityViolation::LabelInfinite(label));
    }
    if probability.is_infinite() {
        return Err(IntegrityViolation::ProbabilityInfinite(probability));
    }
    if label != 0.0 && label != 1.0 {
        return Err(IntegrityViolation::InvalidLabel(label));
    }
    if !(0.0..=1.0).contains(&probability) {
        return Err(IntegrityViolation::ProbabilityOutOfRange(probability));
    }

    Ok(if probability == 0.0 {
        Some(EdgeCase::CertainNoDefault)
    } else if probability == 1.0 {
        Some(EdgeCase::CertainDefault)
    } else {
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_logs;

    #[test]
    fn test_valid_outputs() {
        assert_eq!(validate_outputs(0.0, 0.42), Ok(None));
        assert_eq!(validate_outputs(1.0, 0.87), Ok(None));
    }

    #[test]
    fn test_nan_checked_first() {
        assert_eq!(validate_outputs(f64::NAN, f64::NAN), Err(IntegrityViolation::LabelNaN));
        assert_eq!(validate_outputs(1.0, f64::NAN), Err(IntegrityViolation::ProbabilityNaN));
        assert_eq!(
            validate_outputs(f64::INFINITY, f64::NAN),
            Err(IntegrityViolation::ProbabilityNaN)
        );
    }

    #[test]
    fn test_infinite_before_domain() {
        assert_eq!(
            validate_outputs(f64::NEG_INFINITY, 0.5),
            Err(IntegrityViolation::LabelInfinite(f64::NEG_INFINITY))
        );
        assert_eq!(
            validate_outputs(f64::INFINITY, 0.5),
            Err(IntegrityViolation::LabelInfinite(f64::INFINITY))
        );
        assert_eq!(
            validate_outputs(2.0, f64::INFINITY),
            Err(IntegrityViolation::ProbabilityInfinite(f64::INFINITY))
        );
    }

    #[test]
    fn test_domain_violations() {
        assert_eq!(validate_outputs(2.0, 0.5), Err(IntegrityViolation::InvalidLabel(2.0)));
        assert_eq!(validate_outputs(0.5, 0.5), Err(IntegrityViolation::InvalidLabel(0.5)));
        assert_eq!(validate_outputs(-1.0, 0.5), Err(IntegrityViolation::InvalidLabel(-1.0)));
        assert_eq!(
            validate_outputs(1.0, 1.5),
            Err(IntegrityViolation::ProbabilityOutOfRange(1.5))
        );
        assert_eq!(
            validate_outputs(0.0, -0.1),
            Err(IntegrityViolation::ProbabilityOutOfRange(-0.1))
        );
    }

    #[test]
    fn test_extremes_pass_with_warning() {
        for (label, probability, edge) in [
            (0.0, 0.0, EdgeCase::CertainNoDefault),
            (1.0, 1.0, EdgeCase::CertainDefault),
        ] {
            let (result, logs) = capture_logs(|| validate_outputs(label, probability));
            assert_eq!(result, Ok(Some(edge)));
            assert!(logs.contains("WARN"));
            assert!(logs.contains("Model returned extreme probability"));
        }
    }

    #[test]
    fn test_regular_output_logs_no_warning() {
        let (result, logs) = capture_logs(|| validate_outputs(1.0, 0.87));
        assert_eq!(result, Ok(None));
        assert!(!logs.contains("WARN"));
    }

    #[test]
    fn test_violation_logged_as_error() {
        let (result, logs) = capture_logs(|| validate_outputs(2.0, 0.5));
        assert!(result.is_err());
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("prediction_sanity_check_failed"));
    }
}
