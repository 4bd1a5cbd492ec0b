//! Shaping rules

use drive_protocol::{ActuatorCommand, RawAction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Output-side constants of one trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapingConfig {
    /// Brake values below this are treated as no braking
    pub brake_floor: f32,
    /// Throttle is cut above this speed unless the model is braking (km/h)
    pub speed_limit_kph: f32,
    /// Divide steer, throttle and brake by this (model trained on a compressed range)
    pub output_scale: Option<f32>,
    /// Clamp to actuator ranges after scaling
    pub clamp_output: bool,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            brake_floor: 0.1,
            speed_limit_kph: 20.0,
            output_scale: None,
            clamp_output: true,
        }
    }
}

/// Applies the shaping rules in a fixed order
#[derive(Debug, Clone)]
pub struct ActionShaper {
    config: ShapingConfig,
}

impl ActionShaper {
    pub fn new(config: ShapingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShapingConfig {
        &self.config
    }

    /// Shape a raw prediction taken at `speed_kph`.
    ///
    /// Rule order matters: brake floor, then throttle-over-brake, then the
    /// speed governor, then rescaling and clamping.
    pub fn shape(&self, raw: RawAction, speed_kph: f32) -> ActuatorCommand {
        let RawAction {
            mut steer,
            mut accel,
            mut brake,
        } = raw;

        if brake < self.config.brake_floor {
            brake = 0.0;
        }

        // Avoid fake braking
        if accel > brake {
            brake = 0.0;
        }

        if speed_kph > self.config.speed_limit_kph && brake == 0.0 {
            accel = 0.0;
        }

        if let Some(scale) = self.config.output_scale {
            steer /= scale;
            accel /= scale;
            brake /= scale;
        }

        if self.config.clamp_output {
            steer = steer.clamp(-1.0, 1.0);
            accel = accel.clamp(0.0, 1.0);
            brake = brake.clamp(0.0, 1.0);
        }

        debug!(
            "Shaped action at {:.1} km/h: steer={:.3} throttle={:.3} brake={:.3}",
            speed_kph, steer, accel, brake
        );

        ActuatorCommand {
            steer,
            throttle: accel,
            brake,
            hand_brake: false,
        }
    }
}

impl Default for ActionShaper {
    fn default() -> Self {
        Self::new(ShapingConfig::default())
    }
}
