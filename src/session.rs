// src/session.rs - Per-frame session log with CSV and JSON summary export
use crate::classifier::{Classification, FrameOutcome};
use crate::game::{GameState, HitEvent, Scoreboard, TargetKind};
use crate::landmarks::JointName;
use crate::pipeline::{CaptureStats, WorkerStats};
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct FrameRecord {
    frame: u64,
    timestamp: f64,
    status: &'static str,
    pick_detected: bool,
    kick_detected: bool,

    thumb_tip_x: Option<f64>,
    thumb_tip_y: Option<f64>,
    index_tip_x: Option<f64>,
    index_tip_y: Option<f64>,
    right_ankle_x: Option<f64>,
    right_ankle_y: Option<f64>,
    right_knee_x: Option<f64>,
    right_knee_y: Option<f64>,
    right_hip_x: Option<f64>,
    right_hip_y: Option<f64>,

    hit: Option<&'static str>,
    picks: u32,
    kicks: u32,
}

struct Entry {
    classification: Classification,
    hits: Vec<HitEvent>,
    scores: Scoreboard,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub session_name: String,
    pub frames: usize,
    pub estimator_failures: usize,
    pub pick_frames: usize,
    pub kick_frames: usize,
    pub scores: Scoreboard,
    pub hits: Vec<HitEvent>,
    pub capture: Option<CaptureStats>,
    pub worker: Option<WorkerStats>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    frames: usize,
    estimator_failures: usize,
    pick_frames: usize,
    kick_frames: usize,
}

pub struct SessionRecorder {
    output_dir: PathBuf,
    session_id: Uuid,
    session_name: String,
    retain_frames: bool,
    entries: Vec<Entry>,
    tally: Tally,
    scores: Scoreboard,
    hits: Vec<HitEvent>,
    capture: Option<CaptureStats>,
    worker: Option<WorkerStats>,
}

impl SessionRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_id: Uuid::new_v4(),
            session_name,
            retain_frames: true,
            entries: Vec::new(),
            tally: Tally::default(),
            scores: Scoreboard::default(),
            hits: Vec::new(),
            capture: None,
            worker: None,
        }
    }

    /// With `false` only counters and hits are kept, so memory stays flat on
    /// sessions that never export their per-frame log.
    pub fn retain_frames(mut self, retain: bool) -> Self {
        self.retain_frames = retain;
        self
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    /// Frames recorded so far, retained or not.
    pub fn len(&self) -> usize {
        self.tally.frames
    }

    pub fn is_empty(&self) -> bool {
        self.tally.frames == 0
    }

    pub fn retained_frames(&self) -> usize {
        self.entries.len()
    }

    pub fn record(&mut self, classification: Classification, hits: Vec<HitEvent>, game: &GameState) {
        self.tally.frames += 1;
        if classification.is_failure() {
            self.tally.estimator_failures += 1;
        }
        if classification.pick_detected {
            self.tally.pick_frames += 1;
        }
        if classification.kick_detected {
            self.tally.kick_frames += 1;
        }
        self.scores = game.scores();
        self.hits.extend(hits.iter().cloned());

        if self.retain_frames {
            self.entries.push(Entry {
                classification,
                hits,
                scores: self.scores,
            });
        }
    }

    pub fn set_pipeline_stats(&mut self, capture: Option<CaptureStats>, worker: Option<WorkerStats>) {
        self.capture = capture;
        self.worker = worker;
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.to_string(),
            session_name: self.session_name.clone(),
            frames: self.tally.frames,
            estimator_failures: self.tally.estimator_failures,
            pick_frames: self.tally.pick_frames,
            kick_frames: self.tally.kick_frames,
            scores: self.scores,
            hits: self.hits.clone(),
            capture: self.capture.clone(),
            worker: self.worker.clone(),
        }
    }

    /// Writes `session.csv` (one row per retained frame) and `summary.json`
    /// into the session directory and returns that directory.
    pub fn export(&self) -> Result<PathBuf> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let csv_path = dir.join("session.csv");
        let file = File::create(&csv_path)
            .with_context(|| format!("Failed to create {}", csv_path.display()))?;
        let mut writer = Writer::from_writer(file);
        for entry in &self.entries {
            writer.serialize(Self::create_record(entry))?;
        }
        writer.flush()?;

        let summary_path = dir.join("summary.json");
        let summary = serde_json::to_string_pretty(&self.summary())?;
        std::fs::write(&summary_path, summary)
            .with_context(|| format!("Failed to write {}", summary_path.display()))?;

        info!("Session exported to {}", dir.display());
        Ok(dir)
    }

    fn create_record(entry: &Entry) -> FrameRecord {
        let c = &entry.classification;
        let x = |joint| c.landmarks.get(joint).map(|p| p.x);
        let y = |joint| c.landmarks.get(joint).map(|p| p.y);

        let hit = match entry.hits.as_slice() {
            [] => None,
            [only] => Some(match only.kind {
                TargetKind::Pickable => "pick",
                TargetKind::Bomb => "kick",
            }),
            _ => Some("pick+kick"),
        };

        FrameRecord {
            frame: c.frame_index,
            timestamp: c.timestamp,
            status: match c.outcome {
                FrameOutcome::Processed => "processed",
                FrameOutcome::EstimatorFailed(_) => "estimator_failed",
            },
            pick_detected: c.pick_detected,
            kick_detected: c.kick_detected,
            thumb_tip_x: x(JointName::ThumbTip),
            thumb_tip_y: y(JointName::ThumbTip),
            index_tip_x: x(JointName::IndexTip),
            index_tip_y: y(JointName::IndexTip),
            right_ankle_x: x(JointName::RightAnkle),
            right_ankle_y: y(JointName::RightAnkle),
            right_knee_x: x(JointName::RightKnee),
            right_knee_y: y(JointName::RightKnee),
            right_hip_x: x(JointName::RightHip),
            right_hip_y: y(JointName::RightHip),
            hit,
            picks: entry.scores.picks,
            kicks: entry.scores.kicks,
        }
    }
}
