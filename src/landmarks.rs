// src/landmarks.rs - Joint names, landmark points and per-frame observations
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Joints the game reads from the pose estimator.
///
/// Hand joints come from the hand-pose request, body joints from the
/// body-pose request. Coordinates for both are normalized with a bottom-left
/// origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    ThumbTip,
    IndexTip,
    RightAnkle,
    RightKnee,
    RightHip,
}

impl JointName {
    pub const HAND: [JointName; 2] = [JointName::ThumbTip, JointName::IndexTip];
    pub const BODY: [JointName; 3] = [JointName::RightAnkle, JointName::RightKnee, JointName::RightHip];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointName::ThumbTip => "thumb_tip",
            JointName::IndexTip => "index_tip",
            JointName::RightAnkle => "right_ankle",
            JointName::RightKnee => "right_knee",
            JointName::RightHip => "right_hip",
        }
    }

    pub fn is_hand_joint(&self) -> bool {
        matches!(self, JointName::ThumbTip | JointName::IndexTip)
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recognized joint: normalized location plus estimator confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub location: Point2<f64>,
    pub confidence: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self {
            location: Point2::new(x, y),
            confidence,
        }
    }

    pub fn is_confident(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    pub fn distance_to(&self, other: &LandmarkPoint) -> f64 {
        nalgebra::distance(&self.location, &other.location)
    }
}

/// Joints recognized for one detected hand or body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointObservation {
    pub points: HashMap<JointName, LandmarkPoint>,
}

impl JointObservation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, joint: JointName, point: LandmarkPoint) -> Self {
        self.points.insert(joint, point);
        self
    }

    pub fn get(&self, joint: JointName) -> Option<&LandmarkPoint> {
        self.points.get(&joint)
    }

    /// Returns the requested joints only if every one of them was located and
    /// reaches `threshold`.
    pub fn confident<const N: usize>(
        &self,
        joints: [JointName; N],
        threshold: f64,
    ) -> Option<[LandmarkPoint; N]> {
        let mut found = [LandmarkPoint::new(0.0, 0.0, 0.0); N];
        for (slot, joint) in found.iter_mut().zip(joints) {
            let point = self.get(joint)?;
            if !point.is_confident(threshold) {
                return None;
            }
            *slot = *point;
        }
        Some(found)
    }
}

/// Everything the pose estimator returned for one frame.
///
/// `None` means the estimator found no hand (or no body) in the frame, which
/// is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseObservation {
    #[serde(default)]
    pub hand: Option<JointObservation>,
    #[serde(default)]
    pub body: Option<JointObservation>,
}

impl PoseObservation {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Landmark locations that were used for the current frame's classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSnapshot {
    pub hand: HashMap<JointName, Point2<f64>>,
    pub body: HashMap<JointName, Point2<f64>>,
}

impl LandmarkSnapshot {
    pub fn get(&self, joint: JointName) -> Option<Point2<f64>> {
        if joint.is_hand_joint() {
            self.hand.get(&joint).copied()
        } else {
            self.body.get(&joint).copied()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hand.is_empty() && self.body.is_empty()
    }
}
