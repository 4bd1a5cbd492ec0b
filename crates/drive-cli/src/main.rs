//! Imitation Drive - command line entry point
//!
//! `drive replay` runs the agent over a recorded dataset and prints one JSON
//! line per frame. `drive rebalance` re-files a recorded dataset through the
//! per-maneuver balancer.

use std::path::{Path, PathBuf};

use agent::{AgentConfig, DrivingAgent, Observation, StepOutput, PRESETS};
use anyhow::{bail, Context, Result};
use camera_capture::CameraFrame;
use clap::{Parser, Subcommand};
use drive_protocol::{Measurements, NavigationCommand, VehicleTelemetry};
use recorder::{
    read_samples, BalancerConfig, RecorderConfig, RecordingMode, RecordingSession, SaveOutcome,
};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "drive", version, about = "Imitation-learning driving agent tools")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the agent over every frame of a recorded dataset.
    Replay {
        /// Dataset root containing data.csv
        #[arg(long)]
        dataset: PathBuf,
        /// Agent config file (TOML)
        #[arg(long, conflicts_with_all = ["preset", "model"])]
        config: Option<PathBuf>,
        /// Built-in profile name
        #[arg(long, requires = "model")]
        preset: Option<String>,
        /// ONNX model used with --preset
        #[arg(long, requires = "preset")]
        model: Option<PathBuf>,
        /// Override the recorded command (left, right, straight, lanefollow, void)
        #[arg(long)]
        command: Option<NavigationCommand>,
    },
    /// Re-file a recorded dataset through the category balancer.
    Rebalance {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Frames kept per category
        #[arg(long, default_value_t = 10_000)]
        cap: u32,
        /// Lane-follow frames relabeled per turn window
        #[arg(long, default_value_t = 100)]
        quota: u32,
    },
}

#[derive(Debug, Serialize)]
struct ReplayLine {
    #[serde(flatten)]
    step: StepOutput,
    recorded: Measurements,
}

#[derive(Debug, Default, PartialEq)]
struct RebalanceSummary {
    saved: u64,
    dropped: u64,
    complete: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Replay {
            dataset,
            config,
            preset,
            model,
            command,
        } => {
            let config = match (config, preset, model) {
                (Some(path), _, _) => AgentConfig::load(&path)
                    .with_context(|| format!("loading agent config {}", path.display()))?,
                (None, Some(preset), Some(model)) => AgentConfig::with_preset(model, &preset),
                _ => bail!(
                    "either --config or --preset with --model is required (presets: {})",
                    PRESETS.join(", ")
                ),
            };
            let agent = DrivingAgent::from_config(&config).context("creating driving agent")?;
            replay(&agent, &dataset, command)
        }
        Command::Rebalance {
            input,
            output,
            cap,
            quota,
        } => {
            let balancer = BalancerConfig {
                category_cap: cap,
                redirect_quota: quota,
            };
            let summary = rebalance(&input, &output, balancer)?;
            info!(
                "Rebalanced {} -> {}: {} saved, {} dropped{}",
                input.display(),
                output.display(),
                summary.saved,
                summary.dropped,
                if summary.complete { ", every category full" } else { "" }
            );
            Ok(())
        }
    }
}

fn replay(agent: &DrivingAgent, dataset: &Path, command: Option<NavigationCommand>) -> Result<()> {
    let samples = read_samples(dataset)
        .with_context(|| format!("reading dataset {}", dataset.display()))?;
    info!("Replaying {} frames with profile {}", samples.len(), agent.profile().name);

    let mut fallbacks = 0u64;
    for sample in &samples {
        let frame = CameraFrame::load(&sample.image_path, sample.frame)
            .with_context(|| format!("loading {}", sample.image_path.display()))?;
        let step = agent.run_step(&Observation {
            frame: &frame,
            telemetry: VehicleTelemetry::new(sample.measurements.speed),
            command: command.unwrap_or(sample.command),
            traffic: sample.traffic_state,
        });
        if step.fallback {
            fallbacks += 1;
        }

        let line = ReplayLine {
            step,
            recorded: sample.measurements,
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    if fallbacks > 0 {
        warn!("{} of {} frames fell back to the neutral action", fallbacks, samples.len());
    }
    Ok(())
}

/// Recorded frame indices are kept; images are renamed by the new session.
fn rebalance(input: &Path, output: &Path, balancer: BalancerConfig) -> Result<RebalanceSummary> {
    let samples =
        read_samples(input).with_context(|| format!("reading dataset {}", input.display()))?;

    let mut session = RecordingSession::new(RecorderConfig {
        root: output.to_path_buf(),
        uses_traffic_light: samples.iter().any(|s| s.traffic_state.is_some()),
        mode: RecordingMode::Balanced,
        balancer,
    })
    .with_context(|| format!("creating dataset {}", output.display()))?;

    let mut summary = RebalanceSummary::default();
    for sample in &samples {
        let frame = CameraFrame::load(&sample.image_path, sample.frame)
            .with_context(|| format!("loading {}", sample.image_path.display()))?;

        match session.save(&frame, &sample.measurements, sample.command, sample.traffic_state)? {
            SaveOutcome::Saved { .. } => summary.saved += 1,
            SaveOutcome::Dropped => summary.dropped += 1,
            SaveOutcome::Complete => {
                summary.complete = true;
                break;
            }
        }
    }

    Ok(summary)
}
