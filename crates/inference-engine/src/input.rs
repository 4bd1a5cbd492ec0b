//! Model input contract

use camera_capture::CameraFrame;
use drive_protocol::{NavigationCommand, TrafficLightState, VehicleTelemetry};
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ColorSpace, CommandEncoder, CommandEncoding, ImagePreprocessor, InferenceError};

/// Input-side constants of one trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Network input height (pixels)
    pub image_height: u32,
    /// Network input width (pixels)
    pub image_width: u32,
    /// Color space of the image input
    pub color_space: ColorSpace,
    /// Divide pixel values by 255
    pub normalize: bool,
    /// Speed (km/h) is divided by this before inference
    pub speed_divisor: f32,
    /// Navigation command layout
    pub command_encoding: CommandEncoding,
    /// Model takes a fourth stop/go input
    pub uses_traffic_light: bool,
}

impl InputSpec {
    /// Expected tensor shapes, in model input order
    pub fn input_shapes(&self) -> Vec<Vec<usize>> {
        let mut shapes = vec![
            vec![1, self.image_height as usize, self.image_width as usize, 3],
            vec![1, 1],
            vec![1, self.command_encoding.width()],
        ];
        if self.uses_traffic_light {
            shapes.push(vec![1, 1]);
        }
        shapes
    }
}

/// One batch-of-one sample, ready for the network
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    /// `1 x H x W x 3` image tensor
    pub image: Array4<f32>,
    /// Normalized speed
    pub speed: f32,
    /// Encoded navigation command
    pub command: Vec<f32>,
    /// Stop (0) / go (1) scalar, only for traffic-aware models
    pub traffic: Option<f32>,
}

/// Builds [`ModelInput`]s for one [`InputSpec`]
#[derive(Debug, Clone)]
pub struct InputPipeline {
    spec: InputSpec,
    preprocessor: ImagePreprocessor,
    encoder: CommandEncoder,
}

impl InputPipeline {
    pub fn new(spec: InputSpec) -> Self {
        Self {
            preprocessor: ImagePreprocessor::new(
                spec.image_height,
                spec.image_width,
                spec.color_space,
                spec.normalize,
            ),
            encoder: CommandEncoder::new(spec.command_encoding),
            spec,
        }
    }

    pub fn spec(&self) -> &InputSpec {
        &self.spec
    }

    /// Assemble the model input for one tick.
    ///
    /// A traffic-aware model with no reported light is fed `NoTraffic`,
    /// which collapses to go. Fails only when the frame cannot be turned
    /// into the image tensor.
    pub fn build(
        &self,
        frame: &CameraFrame,
        telemetry: &VehicleTelemetry,
        command: NavigationCommand,
        traffic: Option<TrafficLightState>,
    ) -> Result<ModelInput, InferenceError> {
        let traffic = if self.spec.uses_traffic_light {
            let state = traffic.unwrap_or_default();
            Some(state.signal().as_scalar())
        } else {
            None
        };

        let input = ModelInput {
            image: self.preprocessor.preprocess(frame)?,
            speed: telemetry.speed_kph / self.spec.speed_divisor,
            command: self.encoder.encode(command),
            traffic,
        };

        debug!(
            "Prepared input for frame {}: speed={:.3}, command={:?}, traffic={:?}",
            frame.frame(),
            input.speed,
            input.command,
            input.traffic
        );

        Ok(input)
    }
}
