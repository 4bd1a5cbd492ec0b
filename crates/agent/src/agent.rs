//! Driving agent step

use action_shaper::ActionShaper;
use camera_capture::CameraFrame;
use drive_protocol::{ActuatorCommand, NavigationCommand, TrafficLightState, VehicleTelemetry};
use inference_engine::{DrivingModel, InferenceEngine, InferenceResult, InputPipeline};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{AgentConfig, AgentError, Profile};

/// Everything the agent sees on one simulation tick
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub frame: &'a CameraFrame,
    pub telemetry: VehicleTelemetry,
    /// Planner command for this tick
    pub command: NavigationCommand,
    /// Light affecting the vehicle, if the simulator reports one
    pub traffic: Option<TrafficLightState>,
}

/// Result of one agent step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepOutput {
    pub frame: u64,
    pub control: ActuatorCommand,
    /// Command the action was computed for
    pub command: NavigationCommand,
    /// Inference failed and the neutral action was substituted
    pub fallback: bool,
}

/// Imitation-learning agent driven by a [`Profile`]
pub struct DrivingAgent<M: DrivingModel = Box<dyn DrivingModel>> {
    profile: Profile,
    inputs: InputPipeline,
    engine: InferenceEngine<M>,
    shaper: ActionShaper,
}

impl DrivingAgent {
    /// Load the configured ONNX model and profile
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let profile = config.resolve_profile()?;
        let engine = InferenceEngine::load_onnx(&config.model_path, profile.input.clone())?;
        Self::with_engine(profile, engine)
    }
}

impl<M: DrivingModel> DrivingAgent<M> {
    /// Agent around an already constructed model
    pub fn with_model(profile: Profile, model: M) -> Result<Self, AgentError> {
        let engine = InferenceEngine::new(model, profile.input.clone());
        Self::with_engine(profile, engine)
    }

    fn with_engine(profile: Profile, engine: InferenceEngine<M>) -> Result<Self, AgentError> {
        profile.validate()?;
        info!(
            "Creating driving agent: profile={} input={}x{} traffic={}",
            profile.name,
            profile.input.image_height,
            profile.input.image_width,
            profile.input.uses_traffic_light
        );
        Ok(Self {
            inputs: InputPipeline::new(profile.input.clone()),
            shaper: ActionShaper::new(profile.shaping.clone()),
            engine,
            profile,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn engine(&self) -> &InferenceEngine<M> {
        &self.engine
    }

    /// Compute the actuator command for one tick.
    ///
    /// Blocks on inference; never fails. An unusable frame or a failed
    /// inference yields the neutral action.
    pub fn run_step(&self, observation: &Observation<'_>) -> StepOutput {
        let result = match self.inputs.build(
            observation.frame,
            &observation.telemetry,
            observation.command,
            observation.traffic,
        ) {
            Ok(input) => self.engine.infer(&input),
            Err(e) => InferenceResult::Failed(e.to_string()),
        };

        let (control, fallback) = match result {
            InferenceResult::Predicted(raw) => {
                (self.shaper.shape(raw, observation.telemetry.speed_kph), false)
            }
            InferenceResult::Failed(reason) => {
                warn!(
                    "Frame {}: substituting neutral action ({})",
                    observation.frame.frame(),
                    reason
                );
                (ActuatorCommand::neutral(), true)
            }
        };

        debug!(
            "Frame {} [{}]: steer={:.3} throttle={:.3} brake={:.3}",
            observation.frame.frame(),
            observation.command,
            control.steer,
            control.throttle,
            control.brake
        );

        StepOutput {
            frame: observation.frame.frame(),
            control,
            command: observation.command,
            fallback,
        }
    }
}
