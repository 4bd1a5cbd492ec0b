//! Dataset Recorder
//!
//! Persists captured driving frames as a training dataset: one JPEG per
//! sample plus a `data.csv` log, optionally balanced per maneuver.

mod balancer;
mod dataset;
mod session;

pub use balancer::{Admission, BalancerConfig, CategoryStatus, DatasetBalancer};
pub use dataset::{read_samples, DatasetWriter, RecordedSample, LOG_FILE};
pub use session::{RecorderConfig, RecordingMode, RecordingSession, SaveOutcome};

use thiserror::Error;

/// Recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image write failed: {0}")]
    Image(#[from] camera_capture::CameraError),
    #[error("Malformed log row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
}
