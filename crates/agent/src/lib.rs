//! Imitation-Learning Driving Agent
//!
//! One agent for every trained model: the differences between models
//! (input size, color space, speed scaling, command layout, traffic input,
//! output scaling, speed governor) live in a [`Profile`].

mod agent;
mod profile;

pub use agent::{DrivingAgent, Observation, StepOutput};
pub use profile::{AgentConfig, Profile, PRESETS};

use inference_engine::InferenceError;
use thiserror::Error;

/// Agent errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("No profile or preset configured")]
    MissingProfile,

    #[error("Model error: {0}")]
    Model(#[from] InferenceError),
}
