//! Camera Frame Library for the Driving Agent
//!
//! Frames arrive from the simulator's RGB camera sensor once per tick.
//! Provides:
//! - Owned RGB frame buffers tagged with their frame index
//! - Area-averaging resize (quality-preserving downsample)
//! - RGB to YUV conversion
//! - JPEG save/load for recorded datasets

pub mod frame;

pub use frame::CameraFrame;

use thiserror::Error;

/// Camera frame error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
