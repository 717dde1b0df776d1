// src/estimator.rs - Pose estimator seam plus simulated and replay backends
use crate::error::EstimatorError;
use crate::landmarks::{JointName, JointObservation, LandmarkPoint, PoseObservation};
use crate::video::Frame;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Hand and body pose detection for a single frame.
///
/// Implementations run on the classification worker, one frame at a time.
pub trait PoseEstimator: Send {
    fn name(&self) -> String;
    fn estimate(&mut self, frame: &Frame) -> Result<PoseObservation, EstimatorError>;
}

fn check_frame(frame: &Frame) -> Result<(), EstimatorError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(EstimatorError::InvalidFrame(format!(
            "frame {} has no pixels ({}x{})",
            frame.index,
            frame.width(),
            frame.height()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Frame rate the motion is timed against.
    pub fps: f64,
    /// Seconds between pinches.
    pub pick_period: f64,
    /// Seconds between kicks.
    pub kick_period: f64,
    /// Every n-th frame fails, when set.
    pub failure_every: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            pick_period: 2.0,
            kick_period: 3.0,
            failure_every: None,
        }
    }
}

/// Deterministic stand-in for a real pose backend. The hand drifts over the
/// surface and pinches periodically; the right leg kicks periodically. The
/// output depends only on the frame index.
pub struct SimulatedEstimator {
    config: SimulationConfig,
}

impl SimulatedEstimator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    fn simulate_hand(&self, t: f64) -> Option<JointObservation> {
        // Hand leaves the frame for one second out of every ten.
        if t % 10.0 >= 9.0 {
            return None;
        }

        let confidence = if t % 7.0 >= 6.5 { 0.2 } else { 0.9 };
        let thumb_x = 0.5 + 0.35 * (0.7 * t).sin();
        let thumb_y = 0.5 + 0.35 * (1.1 * t).sin();

        let pinching = t % self.config.pick_period < 0.5;
        let gap = if pinching { 0.03 } else { 0.15 };

        Some(
            JointObservation::new()
                .with(JointName::ThumbTip, LandmarkPoint::new(thumb_x, thumb_y, confidence))
                .with(JointName::IndexTip, LandmarkPoint::new(thumb_x + gap, thumb_y, confidence)),
        )
    }

    fn simulate_body(&self, t: f64) -> Option<JointObservation> {
        let x = 0.3 + 0.25 * (0.5 * t).sin();
        let hip_y = 0.55;
        let knee_y = 0.4;

        let kicking = t % self.config.kick_period < 0.6;
        let ankle_y = if kicking { 0.1 } else { 0.32 };

        Some(
            JointObservation::new()
                .with(JointName::RightHip, LandmarkPoint::new(x, hip_y, 0.85))
                .with(JointName::RightKnee, LandmarkPoint::new(x, knee_y, 0.8))
                .with(JointName::RightAnkle, LandmarkPoint::new(x, ankle_y, 0.75)),
        )
    }
}

impl Default for SimulatedEstimator {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl PoseEstimator for SimulatedEstimator {
    fn name(&self) -> String {
        "Simulated pose".to_string()
    }

    fn estimate(&mut self, frame: &Frame) -> Result<PoseObservation, EstimatorError> {
        check_frame(frame)?;

        if let Some(every) = self.config.failure_every {
            if every > 0 && frame.index % every == every - 1 {
                return Err(EstimatorError::Backend(format!(
                    "simulated failure on frame {}",
                    frame.index
                )));
            }
        }

        let t = frame.index as f64 / self.config.fps;
        Ok(PoseObservation {
            hand: self.simulate_hand(t),
            body: self.simulate_body(t),
        })
    }
}

/// One recorded estimator result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStep {
    Observation(PoseObservation),
    Failure(String),
}

/// Plays back recorded observations in order, one per frame, ignoring pixel
/// content.
pub struct ReplayEstimator {
    steps: Vec<ReplayStep>,
    cursor: usize,
    looping: bool,
}

impl ReplayEstimator {
    pub fn new(steps: Vec<ReplayStep>, looping: bool) -> Self {
        Self {
            steps,
            cursor: 0,
            looping,
        }
    }

    /// Loads a JSON array of steps, e.g.
    /// `[{"observation": {"hand": null, "body": null}}, {"failure": "blurred"}]`.
    pub fn from_file(path: impl AsRef<Path>, looping: bool) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        let steps: Vec<ReplayStep> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse replay file {}", path.display()))?;

        info!("Loaded {} replay steps from {}", steps.len(), path.display());
        Ok(Self::new(steps, looping))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl PoseEstimator for ReplayEstimator {
    fn name(&self) -> String {
        format!("Replay ({} steps)", self.steps.len())
    }

    fn estimate(&mut self, frame: &Frame) -> Result<PoseObservation, EstimatorError> {
        check_frame(frame)?;

        if self.cursor >= self.steps.len() {
            if !self.looping || self.steps.is_empty() {
                return Err(EstimatorError::ReplayExhausted(self.steps.len()));
            }
            debug!("Replay wrapped around");
            self.cursor = 0;
        }

        let step = self.steps[self.cursor].clone();
        self.cursor += 1;

        match step {
            ReplayStep::Observation(observation) => Ok(observation),
            ReplayStep::Failure(reason) => Err(EstimatorError::Backend(reason)),
        }
    }
}
