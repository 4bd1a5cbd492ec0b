//! Driving Model Inference
//!
//! Turns a camera frame, speed and navigation command into the model's
//! input tensors and runs the pre-trained network through tract-onnx.
//! Every input constant is per-model configuration ([`InputSpec`]).

mod encoding;
mod engine;
mod input;
mod preprocess;

pub use encoding::{CommandEncoder, CommandEncoding};
pub use engine::{DrivingModel, InferenceEngine, InferenceResult, MockModel, OnnxModel};
pub use input::{InputPipeline, InputSpec, ModelInput};
pub use preprocess::{ColorSpace, ImagePreprocessor};

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Invalid output: expected {expected} values, got {actual}")]
    InvalidOutputShape { expected: usize, actual: usize },
    #[error("Model produced a non-finite output")]
    NonFiniteOutput,
}
