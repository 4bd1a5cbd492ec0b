//! Model profiles and agent configuration

use std::path::{Path, PathBuf};

use action_shaper::ShapingConfig;
use config::{Config, Environment, File};
use inference_engine::{ColorSpace, CommandEncoding, InputSpec};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AgentError;

/// Names accepted by [`Profile::preset`]
pub const PRESETS: [&str; 3] = ["nvidia_yuv", "conditional", "conditional_traffic"];

/// Every constant tied to one trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub input: InputSpec,
    pub shaping: ShapingConfig,
}

impl Profile {
    /// Built-in profile by name
    pub fn preset(name: &str) -> Result<Self, AgentError> {
        match name {
            "nvidia_yuv" => Ok(Self::nvidia_yuv()),
            "conditional" => Ok(Self::conditional()),
            "conditional_traffic" => Ok(Self::conditional_traffic()),
            other => Err(AgentError::UnknownPreset(other.to_string())),
        }
    }

    /// 66x200 YUV end-to-end model with a scalar command input.
    ///
    /// Trained on outputs compressed to a quarter of the actuator range.
    pub fn nvidia_yuv() -> Self {
        Self {
            name: "nvidia_yuv".to_string(),
            input: InputSpec {
                image_height: 66,
                image_width: 200,
                color_space: ColorSpace::Yuv,
                normalize: true,
                speed_divisor: 100.0,
                command_encoding: CommandEncoding::Scalar,
                uses_traffic_light: false,
            },
            shaping: ShapingConfig {
                brake_floor: 0.1,
                speed_limit_kph: 10.0,
                output_scale: Some(0.25),
                clamp_output: true,
            },
        }
    }

    /// 180x300 RGB command-conditional model
    pub fn conditional() -> Self {
        Self {
            name: "conditional".to_string(),
            input: InputSpec {
                image_height: 180,
                image_width: 300,
                color_space: ColorSpace::Rgb,
                normalize: false,
                speed_divisor: 20.0,
                command_encoding: CommandEncoding::OneHot,
                uses_traffic_light: false,
            },
            shaping: ShapingConfig {
                brake_floor: 0.1,
                speed_limit_kph: 20.0,
                output_scale: None,
                clamp_output: true,
            },
        }
    }

    /// Command-conditional model with a stop/go traffic light input
    pub fn conditional_traffic() -> Self {
        let mut profile = Self::conditional();
        profile.name = "conditional_traffic".to_string();
        profile.input.speed_divisor = 10.0;
        profile.input.uses_traffic_light = true;
        profile
    }

    /// Reject constants that would produce garbage inputs or outputs
    pub fn validate(&self) -> Result<(), AgentError> {
        let invalid = |reason: &str| Err(AgentError::InvalidProfile(format!("{}: {}", self.name, reason)));

        if self.input.image_height == 0 || self.input.image_width == 0 {
            return invalid("image size must be non-zero");
        }
        if !(self.input.speed_divisor.is_finite() && self.input.speed_divisor > 0.0) {
            return invalid("speed_divisor must be positive");
        }
        if let Some(scale) = self.shaping.output_scale {
            if !(scale.is_finite() && scale > 0.0) {
                return invalid("output_scale must be positive");
            }
        }
        if self.shaping.brake_floor < 0.0 {
            return invalid("brake_floor must not be negative");
        }
        Ok(())
    }
}

/// Agent configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// ONNX model file
    pub model_path: PathBuf,
    /// Built-in profile name, used when `profile` is absent
    #[serde(default)]
    pub preset: Option<String>,
    /// Full profile
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl AgentConfig {
    /// Load from a file, with `DRIVE_*` environment overrides
    /// (`DRIVE_PROFILE__SHAPING__SPEED_LIMIT_KPH=15`)
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        Self::load_with_env(path, Self::environment())
    }

    /// `DRIVE_` prefix, `__` between nested keys
    fn environment() -> Environment {
        Environment::with_prefix("DRIVE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env(path: &Path, env: Environment) -> Result<Self, AgentError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(env)
            .build()?;

        let config: AgentConfig = settings.try_deserialize()?;
        let profile = config.resolve_profile()?;
        info!(
            "Loaded agent config: model={} profile={}",
            config.model_path.display(),
            profile.name
        );
        Ok(config)
    }

    /// Config for a built-in preset
    pub fn with_preset(model_path: PathBuf, preset: &str) -> Self {
        Self {
            model_path,
            preset: Some(preset.to_string()),
            profile: None,
        }
    }

    /// The explicit profile if present, otherwise the named preset
    pub fn resolve_profile(&self) -> Result<Profile, AgentError> {
        let profile = match (&self.profile, &self.preset) {
            (Some(profile), _) => profile.clone(),
            (None, Some(preset)) => Profile::preset(preset)?,
            (None, None) => return Err(AgentError::MissingProfile),
        };
        profile.validate()?;
        Ok(profile)
    }
}
