//! Trained classifiers the inference engine can run.
//!
//! A classifier always produces a binary label. Probability output is an
//! optional capability; the engine falls back to the label when it is absent.

use crate::error::ScoringError;
use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Binary classifier over a preprocessed feature vector
pub trait Classifier: Send + Sync {
    /// Algorithm name reported in model metadata
    fn model_type(&self) -> &str;

    /// Expected input width, when the model knows it
    fn input_width(&self) -> Option<usize>;

    /// Predicted class label. Returned as a float so that the output sanity
    /// gate sees exactly what the model produced.
    fn predict_label(&self, features: &[f64]) -> Result<f64>;

    /// Whether `predict_proba` is available
    fn supports_probability(&self) -> bool {
        false
    }

    /// Class probabilities `[p(no default), p(default)]`
    fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>> {
        bail!("{} does not support probability output", self.model_type())
    }
}

impl fmt::Debug for dyn Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("model_type", &self.model_type())
            .field("input_width", &self.input_width())
            .finish()
    }
}

fn default_threshold() -> f64 {
    0.5
}

fn check_threshold(model: &str, threshold: f64) -> std::result::Result<(), ScoringError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ScoringError::corrupt(format!(
            "{} threshold {} is outside [0, 1]",
            model, threshold
        )));
    }
    Ok(())
}

/// Serialized classifier, tagged by `"type"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    GradientBoosting {
        n_features: usize,
        #[serde(default)]
        base_score: f64,
        trees: Vec<Tree>,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Linear max-margin classifier; has no probability output
    LinearSvc { coefficients: Vec<f64>, intercept: f64 },
    /// ONNX graph stored next to the artifact, path relative to the artifacts directory
    Onnx {
        path: String,
        #[serde(default)]
        n_features: Option<usize>,
    },
}

impl ClassifierSpec {
    /// Validate the spec and build a runnable classifier
    pub fn build(
        self,
        artifacts_dir: &Path,
        onnx_threads: usize,
    ) -> std::result::Result<Box<dyn Classifier>, ScoringError> {
        match self {
            ClassifierSpec::LogisticRegression {
                coefficients,
                intercept,
                threshold,
            } => {
                let linear = LinearModel::new(coefficients, intercept)?;
                check_threshold("logistic regression", threshold)?;
                Ok(Box::new(LogisticRegression { linear, threshold }))
            }
            ClassifierSpec::GradientBoosting {
                n_features,
                base_score,
                trees,
                threshold,
            } => Ok(Box::new(GradientBoosting::new(
                n_features, base_score, trees, threshold,
            )?)),
            ClassifierSpec::LinearSvc {
                coefficients,
                intercept,
            } => Ok(Box::new(LinearSvc {
                linear: LinearModel::new(coefficients, intercept)?,
            })),
            ClassifierSpec::Onnx { path, n_features } => {
                build_onnx(&artifacts_dir.join(path), n_features, onnx_threads)
            }
        }
    }
}

#[cfg(feature = "onnx")]
fn build_onnx(
    path: &Path,
    n_features: Option<usize>,
    onnx_threads: usize,
) -> std::result::Result<Box<dyn Classifier>, ScoringError> {
    let classifier =
        super::onnx::OnnxClassifier::load(path, n_features, onnx_threads).map_err(|e| {
            ScoringError::corrupt_with(format!("cannot load ONNX model {}", path.display()), e)
        })?;
    Ok(Box::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn build_onnx(
    path: &Path,
    _n_features: Option<usize>,
    _onnx_threads: usize,
) -> std::result::Result<Box<dyn Classifier>, ScoringError> {
    Err(ScoringError::corrupt(format!(
        "model {} is an ONNX graph but this build has no ONNX support (enable the `onnx` feature)",
        path.display()
    )))
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Shared `w · x + b` core of the linear models
#[derive(Debug, Clone)]
struct LinearModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    fn new(coefficients: Vec<f64>, intercept: f64) -> std::result::Result<Self, ScoringError> {
        if coefficients.is_empty() {
            return Err(ScoringError::corrupt("linear model has no coefficients"));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ScoringError::corrupt("linear model has non-finite parameters"));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    fn decision_function(&self, features: &[f64]) -> Result<f64> {
        ensure!(
            features.len() == self.coefficients.len(),
            "feature vector has {} values, model expects {}",
            features.len(),
            self.coefficients.len()
        );
        Ok(self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept)
    }
}

/// Logistic regression with a decision threshold on p(default)
#[derive(Debug)]
pub struct LogisticRegression {
    linear: LinearModel,
    threshold: f64,
}

impl Classifier for LogisticRegression {
    fn model_type(&self) -> &str {
        "LogisticRegression"
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.linear.coefficients.len())
    }

    fn predict_label(&self, features: &[f64]) -> Result<f64> {
        let p = sigmoid(self.linear.decision_function(features)?);
        Ok(if p >= self.threshold { 1.0 } else { 0.0 })
    }

    fn supports_probability(&self) -> bool {
        true
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        let p = sigmoid(self.linear.decision_function(features)?);
        Ok(vec![1.0 - p, p])
    }
}

/// Linear SVC: label from the sign of the decision function only
#[derive(Debug)]
pub struct LinearSvc {
    linear: LinearModel,
}

impl Classifier for LinearSvc {
    fn model_type(&self) -> &str {
        "LinearSVC"
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.linear.coefficients.len())
    }

    fn predict_label(&self, features: &[f64]) -> Result<f64> {
        let score = self.linear.decision_function(features)?;
        Ok(if score > 0.0 { 1.0 } else { 0.0 })
    }
}

/// One node of a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `x[feature] < threshold` goes left; missing values go right
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { leaf: f64 },
}

/// Regression tree stored as a flat node list, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Children must come after their parent, so evaluation always terminates.
    fn validate(&self, index: usize, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("tree {} is empty", index));
        }
        for (position, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "tree {} node {} splits on feature {} but the model has {} features",
                            index, position, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!(
                            "tree {} node {} has a non-finite threshold",
                            index, position
                        ));
                    }
                    for child in [left, right] {
                        if *child <= position || *child >= self.nodes.len() {
                            return Err(format!(
                                "tree {} node {} has invalid child index {}",
                                index, position, child
                            ));
                        }
                    }
                }
                TreeNode::Leaf { leaf } => {
                    if !leaf.is_finite() {
                        return Err(format!(
                            "tree {} node {} has a non-finite leaf",
                            index, position
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut position = 0;
        loop {
            match &self.nodes[position] {
                TreeNode::Leaf { leaf } => return *leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    position = if features[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Additive tree ensemble with a logistic link
#[derive(Debug)]
pub struct GradientBoosting {
    n_features: usize,
    base_score: f64,
    trees: Vec<Tree>,
    threshold: f64,
}

impl GradientBoosting {
    fn new(
        n_features: usize,
        base_score: f64,
        trees: Vec<Tree>,
        threshold: f64,
    ) -> std::result::Result<Self, ScoringError> {
        if n_features == 0 {
            return Err(ScoringError::corrupt("gradient boosting model declares zero features"));
        }
        if trees.is_empty() {
            return Err(ScoringError::corrupt("gradient boosting model has no trees"));
        }
        if !base_score.is_finite() {
            return Err(ScoringError::corrupt("gradient boosting base score is not finite"));
        }
        check_threshold("gradient boosting", threshold)?;
        for (index, tree) in trees.iter().enumerate() {
            tree.validate(index, n_features).map_err(ScoringError::corrupt)?;
        }
        Ok(Self {
            n_features,
            base_score,
            trees,
            threshold,
        })
    }

    fn margin(&self, features: &[f64]) -> Result<f64> {
        ensure!(
            features.len() == self.n_features,
            "feature vector has {} values, model expects {}",
            features.len(),
            self.n_features
        );
        Ok(self.base_score + self.trees.iter().map(|t| t.evaluate(features)).sum::<f64>())
    }
}

impl Classifier for GradientBoosting {
    fn model_type(&self) -> &str {
        "GradientBoostingClassifier"
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn predict_label(&self, features: &[f64]) -> Result<f64> {
        let p = sigmoid(self.margin(features)?);
        Ok(if p >= self.threshold { 1.0 } else { 0.0 })
    }

    fn supports_probability(&self) -> bool {
        true
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        let p = sigmoid(self.margin(features)?);
        Ok(vec![1.0 - p, p])
    }
}
