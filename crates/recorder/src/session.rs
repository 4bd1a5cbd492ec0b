//! Recording session

use std::path::PathBuf;

use camera_capture::CameraFrame;
use drive_protocol::{Measurements, NavigationCommand, TrafficLightState};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Admission, BalancerConfig, DatasetBalancer, DatasetWriter, RecordedSample, RecorderError};

/// How frames are filed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    /// Per-category directories with caps and lane-follow redistribution
    #[default]
    Balanced,
    /// Every frame kept, grouped by episode
    Episodic,
}

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Dataset root directory
    pub root: PathBuf,
    /// Log a `traffic_state` column
    pub uses_traffic_light: bool,
    pub mode: RecordingMode,
    pub balancer: BalancerConfig,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("_out/recording"),
            uses_traffic_light: false,
            mode: RecordingMode::Balanced,
            balancer: BalancerConfig::default(),
        }
    }
}

/// Result of offering one frame to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Written under `category`
    Saved {
        category: NavigationCommand,
        image_path: PathBuf,
    },
    /// Category full, nothing written
    Dropped,
    /// All driving categories full, nothing written; stop capturing
    Complete,
}

/// A single-writer recording session.
///
/// Owns the balancer counters; I/O errors abort the session rather than
/// leave rows without images. Image files are named by the session's own
/// frame counter, the simulator frame index is only logged in the row.
#[derive(Debug)]
pub struct RecordingSession {
    mode: RecordingMode,
    balancer: DatasetBalancer,
    writer: DatasetWriter,
    episode: u32,
    /// Next image index; advances on every recorded or dropped frame
    frame_number: u64,
    completed: bool,
}

impl RecordingSession {
    pub fn new(config: RecorderConfig) -> Result<Self, RecorderError> {
        let writer = DatasetWriter::create(&config.root, config.uses_traffic_light)?;
        info!("Starting {:?} recording session", config.mode);
        Ok(Self {
            mode: config.mode,
            balancer: DatasetBalancer::new(config.balancer),
            writer,
            episode: 0,
            frame_number: 0,
            completed: false,
        })
    }

    pub fn balancer(&self) -> &DatasetBalancer {
        &self.balancer
    }

    pub fn writer(&self) -> &DatasetWriter {
        &self.writer
    }

    /// Episode index used for episodic image paths
    pub fn start_episode(&mut self, episode: u32) {
        info!("Recording episode {}", episode);
        self.episode = episode;
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Image index the next offered frame gets
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Offer one captured frame.
    ///
    /// A failed write leaves the balancer counters as they were before the
    /// frame was offered.
    pub fn save(
        &mut self,
        image: &CameraFrame,
        measurements: &Measurements,
        command: NavigationCommand,
        traffic_state: Option<TrafficLightState>,
    ) -> Result<SaveOutcome, RecorderError> {
        let frame_number = self.frame_number;
        let counters = self.balancer.clone();

        let (category, image_path) = match self.mode {
            RecordingMode::Episodic => (
                command,
                self.writer.episode_image_path(self.episode, frame_number),
            ),
            RecordingMode::Balanced => match self.balancer.admit(command) {
                Admission::Accept(category) => (
                    category,
                    self.writer.category_image_path(category, frame_number),
                ),
                Admission::Reject => {
                    self.frame_number += 1;
                    return Ok(SaveOutcome::Dropped);
                }
                Admission::Complete => {
                    if !self.completed {
                        info!(
                            "Finish Successful! {} samples recorded",
                            self.writer.rows_written()
                        );
                        self.completed = true;
                    }
                    return Ok(SaveOutcome::Complete);
                }
            },
        };

        let sample = RecordedSample {
            frame: image.frame(),
            image_path: image_path.clone(),
            measurements: *measurements,
            traffic_state,
            command: category,
        };
        if let Err(e) = self.writer.write(image, &sample) {
            self.balancer = counters;
            return Err(e);
        }
        self.frame_number += 1;

        Ok(SaveOutcome::Saved {
            category,
            image_path,
        })
    }
}
