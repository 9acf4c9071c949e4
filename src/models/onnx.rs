//! ONNX Runtime backed classifier

use super::classifier::Classifier;
use anyhow::{anyhow, bail, Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Exported classifier graph with a label output and a probability output.
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    label_name: Option<String>,
    probability_name: Option<String>,
    n_features: Option<usize>,
}

impl OnnxClassifier {
    pub fn load(path: &Path, n_features: Option<usize>, onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;

        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        if label_name.is_none() && probability_name.is_none() {
            bail!("ONNX model has neither a label nor a probability output");
        }

        info!(
            input = %input_name,
            label = ?label_name,
            probabilities = ?probability_name,
            "ONNX model loaded successfully"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_name,
            probability_name,
            n_features,
        })
    }

    fn with_outputs<T>(
        &self,
        features: &[f64],
        read: impl FnOnce(&SessionOutputs) -> Result<T>,
    ) -> Result<T> {
        // shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input = Tensor::from_array((shape, data)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;
        read(&outputs)
    }

    /// Positive-class probability from either a tensor or a seq(map) output
    fn positive_probability(output: &DynValue) -> Result<f64> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let classes = shape.last().copied().unwrap_or(1);
            return match (classes, data) {
                (c, [_, p1, ..]) if c >= 2 => Ok(*p1 as f64),
                (_, [p]) => Ok(*p as f64),
                _ => bail!("unexpected probability tensor shape {:?}", shape),
            };
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            let allocator = Allocator::default();
            let sequence = output
                .downcast_ref::<DynSequenceValueType>()
                .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;
            let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
            let first = maps.first().ok_or_else(|| anyhow!("Empty probability sequence"))?;
            let pairs = first.try_extract_key_values::<i64, f32>()?;

            if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 1) {
                return Ok(*p as f64);
            }
            if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 0) {
                return Ok(1.0 - *p as f64);
            }
            bail!("No class probability found in map");
        }

        bail!("unsupported probability output type")
    }
}

impl Classifier for OnnxClassifier {
    fn model_type(&self) -> &str {
        "OnnxClassifier"
    }

    fn input_width(&self) -> Option<usize> {
        self.n_features
    }

    fn predict_label(&self, features: &[f64]) -> Result<f64> {
        match &self.label_name {
            Some(name) => self.with_outputs(features, |outputs| {
                let output = outputs
                    .get(name.as_str())
                    .ok_or_else(|| anyhow!("missing output '{}'", name))?;
                let (_, labels) = output.try_extract_tensor::<i64>()?;
                let label = labels.first().ok_or_else(|| anyhow!("empty label output"))?;
                debug!(label = *label, "Extracted label");
                Ok(*label as f64)
            }),
            // no label output: threshold the probability
            None => Ok(if self.predict_proba(features)?[1] >= 0.5 { 1.0 } else { 0.0 }),
        }
    }

    fn supports_probability(&self) -> bool {
        self.probability_name.is_some()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        let name = self
            .probability_name
            .as_ref()
            .ok_or_else(|| anyhow!("OnnxClassifier does not support probability output"))?;
        let p = self.with_outputs(features, |outputs| {
            let output = outputs
                .get(name.as_str())
                .ok_or_else(|| anyhow!("missing output '{}'", name))?;
            Self::positive_probability(output)
        })?;
        Ok(vec![1.0 - p, p])
    }
}
