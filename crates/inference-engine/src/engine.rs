//! Inference Engine Implementation

use std::cell::RefCell;
use std::path::Path;
use std::time::Instant;

use drive_protocol::RawAction;
use tracing::{debug, info, warn};
use tract_onnx::prelude::*;

use crate::{InferenceError, InputSpec, ModelInput};

/// A trained driving network.
///
/// Returns the raw output row `[acceleration, steering, brake]`.
pub trait DrivingModel {
    fn predict(&self, input: &ModelInput) -> Result<[f32; 3], InferenceError>;

    /// Short identifier for logs
    fn name(&self) -> &str;
}

/// ONNX model executed with tract
pub struct OnnxModel {
    model_path: String,
    plan: TypedRunnableModel<TypedModel>,
}

impl OnnxModel {
    /// Load and optimize an ONNX model with input facts fixed by `spec`
    pub fn load(path: &Path, spec: &InputSpec) -> Result<Self, InferenceError> {
        let model_path = path.display().to_string();
        info!("Loading driving model from {}", model_path);

        let load_err = |e: TractError| InferenceError::ModelLoadError(e.to_string());

        let mut model = tract_onnx::onnx().model_for_path(path).map_err(load_err)?;
        for (ix, shape) in spec.input_shapes().into_iter().enumerate() {
            model = model
                .with_input_fact(ix, InferenceFact::dt_shape(f32::datum_type(), shape))
                .map_err(load_err)?;
        }

        let plan = model
            .into_optimized()
            .map_err(load_err)?
            .into_runnable()
            .map_err(load_err)?;

        info!("Model loaded successfully");
        Ok(Self { model_path, plan })
    }

    fn tensor(shape: &[usize], data: &[f32]) -> Result<TValue, InferenceError> {
        Tensor::from_shape(shape, data)
            .map(|t| t.into())
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))
    }
}

impl DrivingModel for OnnxModel {
    fn predict(&self, input: &ModelInput) -> Result<[f32; 3], InferenceError> {
        let image = input.image.as_slice().ok_or_else(|| {
            InferenceError::InferenceFailed("image tensor is not contiguous".to_string())
        })?;

        let mut inputs: TVec<TValue> = tvec!(
            Self::tensor(input.image.shape(), image)?,
            Self::tensor(&[1, 1], &[input.speed])?,
            Self::tensor(&[1, input.command.len()], &input.command)?,
        );
        if let Some(traffic) = input.traffic {
            inputs.push(Self::tensor(&[1, 1], &[traffic])?);
        }

        let outputs = self
            .plan
            .run(inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let first = outputs
            .first()
            .ok_or(InferenceError::InvalidOutputShape { expected: 3, actual: 0 })?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let values: Vec<f32> = view.iter().copied().collect();
        match values.as_slice() {
            [accel, steer, brake] => Ok([*accel, *steer, *brake]),
            other => Err(InferenceError::InvalidOutputShape {
                expected: 3,
                actual: other.len(),
            }),
        }
    }

    fn name(&self) -> &str {
        &self.model_path
    }
}

/// Scripted model for development and tests
pub struct MockModel {
    output: Result<[f32; 3], String>,
    last_input: RefCell<Option<ModelInput>>,
}

impl MockModel {
    /// Always predicts `[accel, steer, brake]`
    pub fn constant(output: [f32; 3]) -> Self {
        Self {
            output: Ok(output),
            last_input: RefCell::new(None),
        }
    }

    /// Always fails with `reason`
    pub fn failing(reason: &str) -> Self {
        Self {
            output: Err(reason.to_string()),
            last_input: RefCell::new(None),
        }
    }

    /// Most recent input seen by `predict`
    pub fn last_input(&self) -> Option<ModelInput> {
        self.last_input.borrow().clone()
    }
}

impl DrivingModel for MockModel {
    fn predict(&self, input: &ModelInput) -> Result<[f32; 3], InferenceError> {
        *self.last_input.borrow_mut() = Some(input.clone());
        self.output
            .clone()
            .map_err(InferenceError::InferenceFailed)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl<M: DrivingModel + ?Sized> DrivingModel for Box<M> {
    fn predict(&self, input: &ModelInput) -> Result<[f32; 3], InferenceError> {
        (**self).predict(input)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Result of one inference call
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceResult {
    /// Model produced a finite prediction
    Predicted(RawAction),
    /// Model failed; carries the reason
    Failed(String),
}

impl InferenceResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, InferenceResult::Failed(_))
    }
}

/// Single-sample synchronous inference over a [`DrivingModel`].
///
/// Never propagates model errors: shape mismatches, backend failures and
/// non-finite outputs all become [`InferenceResult::Failed`].
pub struct InferenceEngine<M: DrivingModel = Box<dyn DrivingModel>> {
    model: M,
    spec: InputSpec,
}

impl InferenceEngine {
    /// Load an ONNX model for `spec`
    pub fn load_onnx(path: &Path, spec: InputSpec) -> Result<Self, InferenceError> {
        let model = OnnxModel::load(path, &spec)?;
        Ok(Self::new(Box::new(model), spec))
    }
}

impl<M: DrivingModel> InferenceEngine<M> {
    pub fn new(model: M, spec: InputSpec) -> Self {
        info!("Creating inference engine for model: {}", model.name());
        Self { model, spec }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn spec(&self) -> &InputSpec {
        &self.spec
    }

    /// Run the model on one input
    pub fn infer(&self, input: &ModelInput) -> InferenceResult {
        let start = Instant::now();

        let result = self
            .check_input(input)
            .and_then(|_| self.model.predict(input))
            .map(RawAction::from_model_output)
            .and_then(|action| {
                if action.is_finite() {
                    Ok(action)
                } else {
                    Err(InferenceError::NonFiniteOutput)
                }
            });

        match result {
            Ok(action) => {
                debug!(
                    "Inference completed in {}us: steer={:.3} accel={:.3} brake={:.3}",
                    start.elapsed().as_micros(),
                    action.steer,
                    action.accel,
                    action.brake
                );
                InferenceResult::Predicted(action)
            }
            Err(e) => {
                warn!("Inference failed on {}: {}", self.model.name(), e);
                InferenceResult::Failed(e.to_string())
            }
        }
    }

    fn check_input(&self, input: &ModelInput) -> Result<(), InferenceError> {
        let expected = self.spec.input_shapes();

        let image_shape = input.image.shape().to_vec();
        if image_shape != expected[0] {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("image {:?}", expected[0]),
                actual: format!("image {:?}", image_shape),
            });
        }

        let command_width = self.spec.command_encoding.width();
        if input.command.len() != command_width {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("command [1, {}]", command_width),
                actual: format!("command [1, {}]", input.command.len()),
            });
        }

        if input.traffic.is_some() != self.spec.uses_traffic_light {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{} inputs", expected.len()),
                actual: format!("{} inputs", 3 + usize::from(input.traffic.is_some())),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorSpace, CommandEncoding};
    use ndarray::Array4;

    fn spec() -> InputSpec {
        InputSpec {
            image_height: 2,
            image_width: 3,
            color_space: ColorSpace::Rgb,
            normalize: true,
            speed_divisor: 20.0,
            command_encoding: CommandEncoding::OneHot,
            uses_traffic_light: false,
        }
    }

    fn input() -> ModelInput {
        ModelInput {
            image: Array4::zeros((1, 2, 3, 3)),
            speed: 0.5,
            command: vec![1.0, 0.0, 0.0, 0.0],
            traffic: None,
        }
    }

    #[test]
    fn test_prediction_unpacked_as_accel_steer_brake() {
        let engine = InferenceEngine::new(MockModel::constant([0.6, -0.1, 0.0]), spec());
        assert_eq!(
            engine.infer(&input()),
            InferenceResult::Predicted(RawAction::new(-0.1, 0.6, 0.0))
        );
        assert_eq!(engine.model().last_input(), Some(input()));
    }

    #[test]
    fn test_model_failure_is_contained() {
        let engine = InferenceEngine::new(MockModel::failing("backend exploded"), spec());
        match engine.infer(&input()) {
            InferenceResult::Failed(reason) => assert!(reason.contains("backend exploded")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_output_is_failure() {
        let engine = InferenceEngine::new(MockModel::constant([f32::NAN, 0.0, 0.0]), spec());
        assert!(engine.infer(&input()).is_failed());
    }

    #[test]
    fn test_image_shape_mismatch_never_reaches_model() {
        let engine = InferenceEngine::new(MockModel::constant([0.5, 0.0, 0.0]), spec());
        let mut bad = input();
        bad.image = Array4::zeros((1, 66, 200, 3));

        assert!(engine.infer(&bad).is_failed());
        assert_eq!(engine.model().last_input(), None);
    }

    #[test]
    fn test_unexpected_traffic_input_is_failure() {
        let engine = InferenceEngine::new(MockModel::constant([0.5, 0.0, 0.0]), spec());
        let mut bad = input();
        bad.traffic = Some(1.0);
        assert!(engine.infer(&bad).is_failed());
    }

    #[test]
    fn test_boxed_model_dispatch() {
        let model: Box<dyn DrivingModel> = Box::new(MockModel::constant([0.2, 0.3, 0.4]));
        let engine = InferenceEngine::new(model, spec());
        assert_eq!(
            engine.infer(&input()),
            InferenceResult::Predicted(RawAction::new(0.3, 0.2, 0.4))
        );
    }

    #[test]
    fn test_missing_model_file_fails_to_load() {
        let result = InferenceEngine::load_onnx(Path::new("/nonexistent/model.onnx"), spec());
        assert!(matches!(result, Err(InferenceError::ModelLoadError(_))));
    }
}
