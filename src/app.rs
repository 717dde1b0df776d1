// src/app.rs - Wires capture, classification and the game into one session
use crate::classifier::{Classification, GestureClassifier};
use crate::config::AppConfig;
use crate::estimator::{PoseEstimator, ReplayEstimator, SimulatedEstimator};
use crate::error::PipelineError;
use crate::game::{GameState, HitEvent};
use crate::pipeline::{
    frame_channel, spawn_capture, spawn_classifier, CaptureHandle, CaptureSettings, CaptureStats,
    WorkerStats,
};
use crate::session::{SessionRecorder, SessionSummary};
use crate::video::VideoSource;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum SourceChoice {
    Synthetic,
    Images { dir: PathBuf, looping: bool },
    #[cfg(feature = "camera")]
    Camera,
}

#[derive(Debug, Clone)]
pub enum EstimatorChoice {
    Simulated,
    Replay { path: PathBuf, looping: bool },
}

impl EstimatorChoice {
    pub fn build(&self, config: &AppConfig) -> Result<Box<dyn PoseEstimator>> {
        Ok(match self {
            EstimatorChoice::Simulated => Box::new(SimulatedEstimator::new(config.simulation.clone())),
            EstimatorChoice::Replay { path, looping } => Box::new(ReplayEstimator::from_file(path, *looping)?),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub max_frames: Option<u64>,
    pub seed: Option<u64>,
    pub export: bool,
    pub session_name: Option<String>,
}

/// Capture thread, classification worker and the results channel feeding
/// the game.
pub struct RunningPipeline {
    pub results: mpsc::Receiver<Classification>,
    capture: CaptureHandle,
    worker: JoinHandle<Result<WorkerStats, PipelineError>>,
}

impl RunningPipeline {
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &AppConfig,
        source: SourceChoice,
        estimator: Box<dyn PoseEstimator>,
        max_frames: Option<u64>,
    ) -> Self {
        let (frames_tx, frames_rx) = frame_channel();
        let (results_tx, results) = mpsc::channel(config.capture.results_buffer);

        let capture_config = config.capture.clone();
        let open_source = move || -> Result<VideoSource> {
            match source {
                SourceChoice::Synthetic => Ok(VideoSource::synthetic(
                    capture_config.width,
                    capture_config.height,
                    None,
                )),
                SourceChoice::Images { dir, looping } => VideoSource::images(dir, looping),
                #[cfg(feature = "camera")]
                SourceChoice::Camera => VideoSource::camera(
                    capture_config.camera_index,
                    capture_config.width,
                    capture_config.height,
                    capture_config.fps.round() as u32,
                ),
            }
        };

        let capture = spawn_capture(
            open_source,
            frames_tx,
            CaptureSettings {
                fps: config.capture.fps,
                max_frames,
                ..CaptureSettings::default()
            },
        );
        let worker = spawn_classifier(
            estimator,
            GestureClassifier::new(config.classifier),
            frames_rx,
            results_tx,
        );

        Self {
            results,
            capture,
            worker,
        }
    }

    pub fn stop_capture(&self) {
        self.capture.stop();
    }

    /// Stops capture, waits for both workers and returns their statistics.
    pub async fn finish(self) -> Result<(CaptureStats, WorkerStats)> {
        self.capture.stop();
        drop(self.results);

        let capture = self.capture;
        let capture_stats = tokio::task::spawn_blocking(move || capture.join())
            .await
            .context("Capture join task failed")??;
        let worker_stats = self.worker.await.map_err(PipelineError::from)??;
        Ok((capture_stats, worker_stats))
    }
}

pub struct SessionOutcome {
    pub summary: SessionSummary,
    pub export_dir: Option<PathBuf>,
}

/// Headless game session: runs until the source is exhausted, the frame
/// limit is reached or Ctrl-C is pressed.
pub struct GameSession {
    config: AppConfig,
    game: GameState,
    recorder: SessionRecorder,
}

impl GameSession {
    pub fn new(config: AppConfig, options: &SessionOptions) -> Self {
        let game = GameState::new(config.game.clone(), options.seed);
        // The per-frame log is only kept when it will be written out.
        let recorder = SessionRecorder::new(&config.output.directory, options.session_name.clone())
            .retain_frames(options.export);
        Self { config, game, recorder }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn handle(&mut self, classification: Classification) -> Vec<HitEvent> {
        let hits = self.game.apply(&classification);
        self.recorder.record(classification, hits.clone(), &self.game);
        hits
    }

    pub async fn run(
        mut self,
        source: SourceChoice,
        estimator: Box<dyn PoseEstimator>,
        options: SessionOptions,
    ) -> Result<SessionOutcome> {
        info!("Starting session with {}", estimator.name());
        let mut pipeline = RunningPipeline::start(&self.config, source, estimator, options.max_frames);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                next = pipeline.results.recv() => match next {
                    Some(classification) => {
                        self.handle(classification);
                    }
                    None => break,
                },
                _ = &mut ctrl_c => {
                    info!("Interrupted, stopping capture");
                    pipeline.stop_capture();
                    // Keep draining until the worker finishes.
                    while let Some(classification) = pipeline.results.recv().await {
                        self.handle(classification);
                    }
                    break;
                }
            }
        }

        let (capture_stats, worker_stats) = pipeline.finish().await?;
        self.recorder.set_pipeline_stats(Some(capture_stats), Some(worker_stats));

        let summary = self.recorder.summary();
        let export_dir = if options.export {
            match self.recorder.export() {
                Ok(dir) => Some(dir),
                Err(e) => {
                    warn!("Session export failed: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(SessionOutcome { summary, export_dir })
    }
}
