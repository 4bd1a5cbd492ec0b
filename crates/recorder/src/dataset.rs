//! Dataset log: captured images plus one `data.csv` row per sample

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use camera_capture::CameraFrame;
use drive_protocol::{Measurements, NavigationCommand, TrafficLightState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::RecorderError;

/// Log file name at the dataset root
pub const LOG_FILE: &str = "data.csv";

/// One persisted training sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSample {
    /// Global frame index
    /// Simulator frame index
    pub frame: u64,
    pub image_path: PathBuf,
    pub measurements: Measurements,
    /// Present only in traffic-aware datasets
    pub traffic_state: Option<TrafficLightState>,
    /// Command logged with the sample (after any relabeling)
    pub command: NavigationCommand,
}

impl RecordedSample {
    /// Maneuver category the sample is filed under
    pub fn category(&self) -> NavigationCommand {
        self.command
    }
}

/// Appends samples to a dataset directory.
///
/// The image is written before its row, so every row references a file
/// that exists. Writes are not atomic: an abrupt stop can leave an image
/// with no row. Opening an existing dataset appends to its log.
#[derive(Debug)]
pub struct DatasetWriter {
    root: PathBuf,
    with_traffic: bool,
    rows_written: u64,
}

impl DatasetWriter {
    /// Open (creating if needed) a dataset rooted at `root`
    pub fn create(root: &Path, with_traffic: bool) -> Result<Self, RecorderError> {
        fs::create_dir_all(root)?;
        info!("Recording dataset to {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            with_traffic,
            rows_written: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// `{root}/{category}/images/{frame:09}.jpg`
    pub fn category_image_path(&self, category: NavigationCommand, frame: u64) -> PathBuf {
        self.root
            .join(category.as_str())
            .join("images")
            .join(format!("{:09}.jpg", frame))
    }

    /// `{root}/images/{episode:02}/{frame:09}.jpg`
    pub fn episode_image_path(&self, episode: u32, frame: u64) -> PathBuf {
        self.root
            .join("images")
            .join(format!("{:02}", episode))
            .join(format!("{:09}.jpg", frame))
    }

    /// CSV header for this dataset's schema
    pub fn header(&self) -> &'static str {
        if self.with_traffic {
            "frame,image_path,throttle,steering_angle,brake,speed,traffic_state,high_level_command"
        } else {
            "frame,image_path,throttle,steering_angle,brake,speed,high_level_command"
        }
    }

    /// Persist the image, then append its row.
    ///
    /// The header goes in front of the first row of a new log, whatever
    /// frame index that row carries.
    pub fn write(&mut self, image: &CameraFrame, sample: &RecordedSample) -> Result<(), RecorderError> {
        image.save_jpeg(&sample.image_path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())?;
        let needs_header = file.metadata()?.len() == 0;
        let mut out = BufWriter::new(file);

        if needs_header {
            writeln!(out, "{}", self.header())?;
        }
        writeln!(out, "{}", self.format_row(sample))?;
        out.flush()?;

        self.rows_written += 1;
        debug!(
            "Recorded frame {} as {} -> {}",
            sample.frame,
            sample.command,
            sample.image_path.display()
        );
        Ok(())
    }

    fn format_row(&self, sample: &RecordedSample) -> String {
        let m = &sample.measurements;
        let mut fields = vec![
            sample.frame.to_string(),
            quote(&sample.image_path.display().to_string()),
            m.throttle.to_string(),
            m.steer.to_string(),
            m.brake.to_string(),
            m.speed.to_string(),
        ];
        if self.with_traffic {
            let state = sample.traffic_state.unwrap_or_default();
            fields.push(state.value().to_string());
        }
        fields.push(sample.command.value().to_string());
        fields.join(",")
    }
}

/// Quote a CSV field when it contains a separator or quote
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split one CSV line, honouring double-quoted fields
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Read every sample from a dataset's `data.csv`.
///
/// Accepts both schemas (with and without `traffic_state`). The header
/// line is optional.
pub fn read_samples(root: &Path) -> Result<Vec<RecordedSample>, RecorderError> {
    let file = File::open(root.join(LOG_FILE))?;
    let mut samples = Vec::new();

    for (ix, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line_no = ix + 1;
        if line.trim().is_empty() || line.starts_with("frame") {
            continue;
        }
        samples.push(parse_row(&line, line_no)?);
    }

    info!("Read {} samples from {}", samples.len(), root.display());
    Ok(samples)
}

fn parse_row(line: &str, line_no: usize) -> Result<RecordedSample, RecorderError> {
    let malformed = |reason: String| RecorderError::MalformedRow {
        line: line_no,
        reason,
    };

    let fields = split_row(line);
    let with_traffic = match fields.len() {
        7 => false,
        8 => true,
        n => return Err(malformed(format!("expected 7 or 8 fields, got {}", n))),
    };

    let number = |ix: usize, name: &str| -> Result<f32, RecorderError> {
        fields[ix]
            .trim()
            .parse::<f32>()
            .map_err(|e| malformed(format!("{}: {}", name, e)))
    };
    let integer = |ix: usize, name: &str| -> Result<i32, RecorderError> {
        fields[ix]
            .trim()
            .parse::<i32>()
            .map_err(|e| malformed(format!("{}: {}", name, e)))
    };

    let frame = fields[0]
        .trim()
        .parse::<u64>()
        .map_err(|e| malformed(format!("frame: {}", e)))?;
    let measurements = Measurements {
        throttle: number(2, "throttle")?,
        steer: number(3, "steering_angle")?,
        brake: number(4, "brake")?,
        speed: number(5, "speed")?,
    };

    let traffic_state = if with_traffic {
        let value = integer(6, "traffic_state")?;
        Some(TrafficLightState::try_from(value).map_err(|e| malformed(e.to_string()))?)
    } else {
        None
    };
    let command = NavigationCommand::from_value(integer(fields.len() - 1, "high_level_command")?);

    Ok(RecordedSample {
        frame,
        image_path: PathBuf::from(&fields[1]),
        measurements,
        traffic_state,
        command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("recorder-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn frame(index: u64) -> CameraFrame {
        CameraFrame::new(vec![90; 8 * 4 * 3], 8, 4, index).unwrap()
    }

    fn sample(writer: &DatasetWriter, index: u64, command: NavigationCommand) -> RecordedSample {
        RecordedSample {
            frame: index,
            image_path: writer.category_image_path(command, index),
            measurements: Measurements {
                throttle: 0.5,
                steer: -0.25,
                brake: 0.0,
                speed: 12.5,
            },
            traffic_state: None,
            command,
        }
    }

    #[test]
    fn test_category_image_path_layout() {
        let writer = DatasetWriter {
            root: PathBuf::from("/data/run"),
            with_traffic: false,
            rows_written: 0,
        };
        assert_eq!(
            writer.category_image_path(NavigationCommand::LaneFollow, 42),
            PathBuf::from("/data/run/lanefollow/images/000000042.jpg")
        );
        assert_eq!(
            writer.episode_image_path(3, 7),
            PathBuf::from("/data/run/images/03/000000007.jpg")
        );
    }

    #[test]
    fn test_header_written_once() {
        let root = temp_root("header");
        let mut writer = DatasetWriter::create(&root, false).unwrap();

        for index in 0..3 {
            let s = sample(&writer, index, NavigationCommand::Left);
            writer.write(&frame(index), &s).unwrap();
        }

        let log = fs::read_to_string(writer.log_path()).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], writer.header());
        assert!(lines[1].starts_with("0,"));
        assert!(lines[1].ends_with(",1"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("frame")).count(), 1);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_header_when_first_frame_is_not_zero() {
        let root = temp_root("offset");
        let mut writer = DatasetWriter::create(&root, false).unwrap();
        for index in [5000, 5001] {
            let s = sample(&writer, index, NavigationCommand::LaneFollow);
            writer.write(&frame(index), &s).unwrap();
        }

        // reopening appends without a second header
        let mut writer = DatasetWriter::create(&root, false).unwrap();
        let s = sample(&writer, 5002, NavigationCommand::Right);
        writer.write(&frame(5002), &s).unwrap();

        let log = fs::read_to_string(writer.log_path()).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], writer.header());
        assert!(lines[1].starts_with("5000,"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("frame")).count(), 1);
        assert_eq!(read_samples(&root).unwrap().len(), 3);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_every_row_references_existing_image() {
        let root = temp_root("images");
        let mut writer = DatasetWriter::create(&root, false).unwrap();

        for (index, command) in [(0, NavigationCommand::Right), (5, NavigationCommand::Void)] {
            let s = sample(&writer, index, command);
            writer.write(&frame(index), &s).unwrap();
        }

        let samples = read_samples(&root).unwrap();
        assert_eq!(samples.len(), 2);
        for s in &samples {
            assert!(s.image_path.exists(), "{} missing", s.image_path.display());
        }
        assert_eq!(samples[1].category(), NavigationCommand::Void);
        assert_eq!(writer.rows_written(), 2);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_traffic_schema_read_back() {
        let root = temp_root("traffic");
        let mut writer = DatasetWriter::create(&root, true).unwrap();

        let mut s = sample(&writer, 0, NavigationCommand::Straight);
        s.traffic_state = Some(TrafficLightState::Yellow);
        writer.write(&frame(0), &s).unwrap();

        let samples = read_samples(&root).unwrap();
        assert_eq!(samples, vec![s]);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_rows_without_header_parse() {
        let row = parse_row("17,out/left/images/000000017.jpg,0.3,0.1,0,22.5,1", 1).unwrap();
        assert_eq!(row.frame, 17);
        assert_eq!(row.command, NavigationCommand::Left);
        assert_eq!(row.traffic_state, None);
        assert_eq!(row.measurements.speed, 22.5);
    }

    #[test]
    fn test_malformed_rows_rejected() {
        assert!(matches!(
            parse_row("1,2,3", 4),
            Err(RecorderError::MalformedRow { line: 4, .. })
        ));
        assert!(parse_row("x,p,0,0,0,0,1", 1).is_err());
        assert!(parse_row("1,p,0,0,0,0,9,4", 1).is_err());
    }

    #[test]
    fn test_out_of_range_codes_rejected() {
        // 2^32 + 1 must not wrap around to 1 (left / red)
        assert!(matches!(
            parse_row("1,p,0,0,0,0,4294967297", 2),
            Err(RecorderError::MalformedRow { line: 2, .. })
        ));
        assert!(matches!(
            parse_row("1,p,0,0,0,0,4294967297,4", 3),
            Err(RecorderError::MalformedRow { line: 3, .. })
        ));
        assert!(parse_row("-1,p,0,0,0,0,4", 1).is_err());
    }

    #[test]
    fn test_quoted_paths_round_trip() {
        let path = "runs/a,b/\"x\".jpg";
        let fields = split_row(&format!("1,{},0", quote(path)));
        assert_eq!(fields, vec!["1".to_string(), path.to_string(), "0".to_string()]);
    }
}
