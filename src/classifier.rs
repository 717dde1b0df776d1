// src/classifier.rs - Pick / kick classification from landmark geometry
use crate::error::EstimatorError;
use crate::landmarks::{JointName, JointObservation, LandmarkSnapshot, PoseObservation};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum estimator confidence for a joint to be trusted.
    pub confidence_threshold: f64,
    /// Thumb-to-index distance (normalized) below which the hand is pinching.
    pub pick_threshold: f64,
    /// How far the ankle must sit below knee and hip on the estimator's
    /// vertical axis to count as a kick.
    pub kick_margin: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.3,
            pick_threshold: 0.08,
            kick_margin: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FrameOutcome {
    Processed,
    EstimatorFailed(String),
}

/// Immutable result for one frame, handed to whoever owns the game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub frame_index: u64,
    pub timestamp: f64,
    pub pick_detected: bool,
    pub kick_detected: bool,
    pub landmarks: LandmarkSnapshot,
    pub outcome: FrameOutcome,
}

impl Classification {
    pub fn nothing_detected(frame_index: u64, timestamp: f64, outcome: FrameOutcome) -> Self {
        Self {
            frame_index,
            timestamp,
            pick_detected: false,
            kick_detected: false,
            landmarks: LandmarkSnapshot::default(),
            outcome,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, FrameOutcome::EstimatorFailed(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    config: ClassifierConfig,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Turns the estimator's result for one frame into a classification.
    /// An estimator error degrades to "nothing detected".
    pub fn classify(
        &self,
        frame_index: u64,
        timestamp: f64,
        estimate: Result<PoseObservation, EstimatorError>,
    ) -> Classification {
        let observation = match estimate {
            Ok(observation) => observation,
            Err(e) => {
                warn!("Pose estimation failed on frame {}: {}", frame_index, e);
                return Classification::nothing_detected(
                    frame_index,
                    timestamp,
                    FrameOutcome::EstimatorFailed(e.to_string()),
                );
            }
        };

        let mut landmarks = LandmarkSnapshot::default();
        let pick_detected = self.detect_pick(observation.hand.as_ref(), &mut landmarks);
        let kick_detected = self.detect_kick(observation.body.as_ref(), &mut landmarks);

        if pick_detected || kick_detected {
            debug!(
                "Frame {}: pick={} kick={}",
                frame_index, pick_detected, kick_detected
            );
        }

        Classification {
            frame_index,
            timestamp,
            pick_detected,
            kick_detected,
            landmarks,
            outcome: FrameOutcome::Processed,
        }
    }

    fn detect_pick(&self, hand: Option<&JointObservation>, landmarks: &mut LandmarkSnapshot) -> bool {
        let Some(hand) = hand else {
            return false;
        };
        let Some([thumb, index]) = hand.confident(JointName::HAND, self.config.confidence_threshold) else {
            trace!("Hand landmarks below confidence threshold");
            return false;
        };

        landmarks.hand.insert(JointName::ThumbTip, thumb.location);
        landmarks.hand.insert(JointName::IndexTip, index.location);

        let distance = thumb.distance_to(&index);
        trace!("Thumb-index distance: {:.4}", distance);
        distance < self.config.pick_threshold
    }

    fn detect_kick(&self, body: Option<&JointObservation>, landmarks: &mut LandmarkSnapshot) -> bool {
        let Some(body) = body else {
            return false;
        };
        let Some([ankle, knee, hip]) = body.confident(JointName::BODY, self.config.confidence_threshold) else {
            trace!("Leg landmarks below confidence threshold");
            return false;
        };

        landmarks.body.insert(JointName::RightAnkle, ankle.location);
        landmarks.body.insert(JointName::RightKnee, knee.location);
        landmarks.body.insert(JointName::RightHip, hip.location);

        let margin = self.config.kick_margin;
        ankle.location.y < knee.location.y - margin && ankle.location.y < hip.location.y - margin
    }
}
