//! Model artifacts, loading, inference and output checks

pub mod artifact;
pub mod classifier;
pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocessor;
pub mod sanity;

pub use artifact::{ModelInfo, ModelMetadata};
pub use classifier::Classifier;
pub use inference::InferenceEngine;
pub use loader::ArtifactLoader;
