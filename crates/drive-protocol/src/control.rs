//! Vehicle telemetry and control values

use serde::{Deserialize, Serialize};

/// Per-tick vehicle telemetry snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    /// Forward speed (km/h)
    pub speed_kph: f32,
}

impl VehicleTelemetry {
    pub fn new(speed_kph: f32) -> Self {
        Self { speed_kph }
    }
}

/// Control and speed recorded alongside a captured frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub throttle: f32,
    pub steer: f32,
    pub brake: f32,
    /// Speed at capture time (km/h)
    pub speed: f32,
}

impl Measurements {
    /// Measurements for a tick where `control` was applied at `telemetry`
    pub fn from_control(control: &ActuatorCommand, telemetry: &VehicleTelemetry) -> Self {
        Self {
            throttle: control.throttle,
            steer: control.steer,
            brake: control.brake,
            speed: telemetry.speed_kph,
        }
    }
}

/// Unshaped network prediction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    pub steer: f32,
    pub accel: f32,
    pub brake: f32,
}

impl RawAction {
    pub fn new(steer: f32, accel: f32, brake: f32) -> Self {
        Self { steer, accel, brake }
    }

    /// Unpack a network output row.
    ///
    /// The trained models emit `[acceleration, steering, brake]`, which is
    /// not the order the rest of the pipeline uses.
    pub fn from_model_output(output: [f32; 3]) -> Self {
        let [accel, steer, brake] = output;
        Self { steer, accel, brake }
    }

    pub fn is_finite(&self) -> bool {
        self.steer.is_finite() && self.accel.is_finite() && self.brake.is_finite()
    }
}

/// Command applied to the vehicle actuators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// Steering in [-1, 1]
    pub steer: f32,
    /// Throttle in [0, 1]
    pub throttle: f32,
    /// Brake in [0, 1]
    pub brake: f32,
    pub hand_brake: bool,
}

impl ActuatorCommand {
    /// No steering, no throttle, no brake
    pub fn neutral() -> Self {
        Self {
            steer: 0.0,
            throttle: 0.0,
            brake: 0.0,
            hand_brake: false,
        }
    }
}

impl Default for ActuatorCommand {
    fn default() -> Self {
        Self::neutral()
    }
}
