// src/pipeline.rs - Capture thread -> latest-wins frame slot -> serial classification worker
use crate::classifier::{Classification, GestureClassifier};
use crate::error::PipelineError;
use crate::estimator::PoseEstimator;
use crate::video::{Frame, VideoSource};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Slot {
    pending: Mutex<Option<Frame>>,
    notify: Notify,
    closed: AtomicBool,
    receiver_gone: AtomicBool,
    dropped: AtomicU64,
}

/// What happened to a frame handed to [`FrameSender::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The slot was empty.
    Queued,
    /// An older, not yet classified frame was discarded in favour of this one.
    Replaced { dropped_index: u64 },
    /// The classification side has shut down.
    Closed,
}

/// Capacity-1 channel with latest-wins semantics: a new frame replaces any
/// frame the worker has not picked up yet.
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let slot = Arc::new(Slot {
        pending: Mutex::new(None),
        notify: Notify::new(),
        closed: AtomicBool::new(false),
        receiver_gone: AtomicBool::new(false),
        dropped: AtomicU64::new(0),
    });
    (
        FrameSender { slot: slot.clone() },
        FrameReceiver { slot },
    )
}

pub struct FrameSender {
    slot: Arc<Slot>,
}

impl FrameSender {
    pub fn send(&self, frame: Frame) -> SendOutcome {
        if self.slot.receiver_gone.load(Ordering::Acquire) {
            return SendOutcome::Closed;
        }

        let previous = {
            let mut pending = match self.slot.pending.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            pending.replace(frame)
        };
        self.slot.notify.notify_one();

        match previous {
            Some(old) => {
                self.slot.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Dropped frame {} (worker busy)", old.index);
                SendOutcome::Replaced { dropped_index: old.index }
            }
            None => SendOutcome::Queued,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.receiver_gone.load(Ordering::Acquire)
    }

    pub fn dropped(&self) -> u64 {
        self.slot.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for FrameSender {
    fn drop(&mut self) {
        self.slot.closed.store(true, Ordering::Release);
        self.slot.notify.notify_one();
    }
}

pub struct FrameReceiver {
    slot: Arc<Slot>,
}

impl FrameReceiver {
    fn take(&self) -> Option<Frame> {
        let mut pending = match self.slot.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.take()
    }

    /// Waits for the next frame. Returns `None` once the sender is gone and
    /// the pending frame (if any) has been handed out.
    pub async fn recv(&self) -> Option<Frame> {
        loop {
            if let Some(frame) = self.take() {
                return Some(frame);
            }
            if self.slot.closed.load(Ordering::Acquire) {
                // A frame may have landed between the take and the flag check.
                return self.take();
            }
            self.slot.notify.notified().await;
        }
    }

    pub fn dropped(&self) -> u64 {
        self.slot.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for FrameReceiver {
    fn drop(&mut self) {
        self.slot.receiver_gone.store(true, Ordering::Release);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureStats {
    pub captured: u64,
    pub dropped: u64,
    pub read_errors: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkerStats {
    pub classified: u64,
    pub estimator_failures: u64,
    pub pick_frames: u64,
    pub kick_frames: u64,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub fps: f64,
    pub max_frames: Option<u64>,
    /// Consecutive read errors tolerated before the capture thread gives up.
    pub max_consecutive_errors: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            fps: 30.0,
            max_frames: None,
            max_consecutive_errors: 30,
        }
    }
}

pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    thread: thread::JoinHandle<Result<CaptureStats>>,
}

impl CaptureHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn join(self) -> Result<CaptureStats, PipelineError> {
        match self.thread.join() {
            Ok(result) => result.map_err(PipelineError::Source),
            Err(_) => Err(PipelineError::CaptureThread),
        }
    }
}

/// Starts the capture thread. The source is built on that thread so sources
/// that are not `Send` (camera handles) never cross threads.
pub fn spawn_capture<F>(open_source: F, sender: FrameSender, settings: CaptureSettings) -> CaptureHandle
where
    F: FnOnce() -> Result<VideoSource> + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let thread = thread::spawn(move || -> Result<CaptureStats> {
        let interval = if settings.fps > 0.0 {
            Duration::try_from_secs_f64(1.0 / settings.fps)
                .with_context(|| format!("Unusable capture rate {} fps", settings.fps))?
        } else {
            Duration::ZERO
        };

        let mut source = open_source()?;
        info!("Capture started: {}", source.describe());
        let started = Instant::now();
        let mut stats = CaptureStats::default();
        let mut consecutive_errors = 0;

        while !stop_flag.load(Ordering::Acquire) {
            if settings.max_frames.is_some_and(|max| stats.captured >= max) {
                break;
            }

            let tick = Instant::now();
            match source.read_frame() {
                Ok(Some(image)) => {
                    consecutive_errors = 0;
                    let frame = Frame::new(stats.captured, started.elapsed().as_secs_f64(), image);
                    stats.captured += 1;
                    if sender.send(frame) == SendOutcome::Closed {
                        debug!("Classification side closed, stopping capture");
                        break;
                    }
                }
                Ok(None) => {
                    info!("Source exhausted after {} frames", stats.captured);
                    break;
                }
                Err(e) => {
                    stats.read_errors += 1;
                    consecutive_errors += 1;
                    warn!("Frame read failed: {}", e);
                    if consecutive_errors >= settings.max_consecutive_errors {
                        return Err(e.context("Too many consecutive frame read errors"));
                    }
                }
            }

            if let Some(rest) = interval.checked_sub(tick.elapsed()) {
                thread::sleep(rest);
            }
        }

        stats.dropped = sender.dropped();
        info!(
            "Capture finished: {} captured, {} dropped, {} read errors",
            stats.captured, stats.dropped, stats.read_errors
        );
        Ok(stats)
    });

    CaptureHandle { stop, thread }
}

/// Runs the estimator and classifier on one frame at a time until the frame
/// channel closes or nobody listens for results anymore.
pub fn spawn_classifier(
    mut estimator: Box<dyn PoseEstimator>,
    classifier: GestureClassifier,
    frames: FrameReceiver,
    results: mpsc::Sender<Classification>,
) -> JoinHandle<Result<WorkerStats, PipelineError>> {
    tokio::spawn(async move {
        info!("Classification worker started with {}", estimator.name());
        let mut stats = WorkerStats::default();

        while let Some(frame) = frames.recv().await {
            // Estimation is blocking work; the estimator travels to the
            // blocking pool and back so only one frame is ever in flight.
            let frame_classifier = classifier.clone();
            let (returned, classification) = tokio::task::spawn_blocking(move || {
                let estimate = estimator.estimate(&frame);
                let classification = frame_classifier.classify(frame.index, frame.timestamp, estimate);
                (estimator, classification)
            })
            .await?;
            estimator = returned;

            stats.classified += 1;
            if classification.is_failure() {
                stats.estimator_failures += 1;
            }
            if classification.pick_detected {
                stats.pick_frames += 1;
            }
            if classification.kick_detected {
                stats.kick_frames += 1;
            }

            if results.send(classification).await.is_err() {
                debug!("Result receiver dropped, stopping worker");
                break;
            }
        }

        info!(
            "Classification worker finished: {} frames, {} estimator failures",
            stats.classified, stats.estimator_failures
        );
        Ok(stats)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FrameOutcome;
    use crate::error::EstimatorError;
    use crate::estimator::{ReplayEstimator, ReplayStep};
    use crate::landmarks::{JointName, JointObservation, LandmarkPoint, PoseObservation};
    use image::{DynamicImage, RgbImage};

    fn frame(index: u64) -> Frame {
        Frame::new(index, index as f64 / 30.0, DynamicImage::ImageRgb8(RgbImage::new(4, 4)))
    }

    fn pinch() -> PoseObservation {
        PoseObservation {
            hand: Some(
                JointObservation::new()
                    .with(JointName::ThumbTip, LandmarkPoint::new(0.5, 0.5, 0.9))
                    .with(JointName::IndexTip, LandmarkPoint::new(0.52, 0.5, 0.9)),
            ),
            body: None,
        }
    }

    #[tokio::test]
    async fn newer_frame_replaces_pending_one() {
        let (tx, rx) = frame_channel();
        assert_eq!(tx.send(frame(0)), SendOutcome::Queued);
        assert_eq!(tx.send(frame(1)), SendOutcome::Replaced { dropped_index: 0 });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.index, 1);
        assert_eq!(rx.dropped(), 1);
    }

    #[tokio::test]
    async fn closed_sender_drains_pending_frame_then_ends() {
        let (tx, rx) = frame_channel();
        tx.send(frame(3));
        drop(tx);

        assert_eq!(rx.recv().await.unwrap().index, 3);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn receiver_wakes_when_frame_arrives_later() {
        let (tx, rx) = frame_channel();
        let waiter = tokio::spawn(async move { rx.recv().await.map(|f| f.index) });

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(frame(9));

        assert_eq!(waiter.await.unwrap(), Some(9));
    }

    #[test]
    fn sender_reports_closed_receiver() {
        let (tx, rx) = frame_channel();
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.send(frame(0)), SendOutcome::Closed);
    }

    #[tokio::test]
    async fn worker_classifies_and_survives_estimator_failures() {
        let estimator = ReplayEstimator::new(
            vec![
                ReplayStep::Observation(pinch()),
                ReplayStep::Failure("bad frame".into()),
                ReplayStep::Observation(PoseObservation::empty()),
            ],
            false,
        );
        let (tx, rx) = frame_channel();
        let (results_tx, mut results_rx) = mpsc::channel(8);
        let worker = spawn_classifier(Box::new(estimator), GestureClassifier::default(), rx, results_tx);

        let mut seen = Vec::new();
        for i in 0..3 {
            tx.send(frame(i));
            seen.push(results_rx.recv().await.unwrap());
        }
        drop(tx);

        let stats = worker.await.unwrap().unwrap();
        assert_eq!(stats.classified, 3);
        assert_eq!(stats.estimator_failures, 1);
        assert_eq!(stats.pick_frames, 1);

        assert!(seen[0].pick_detected);
        assert_eq!(
            seen[1].outcome,
            FrameOutcome::EstimatorFailed(EstimatorError::Backend("bad frame".into()).to_string())
        );
        assert!(!seen[1].pick_detected && !seen[1].kick_detected);
        assert_eq!(seen[2].outcome, FrameOutcome::Processed);
    }

    #[tokio::test]
    async fn worker_stops_when_results_are_ignored() {
        let estimator = ReplayEstimator::new(vec![ReplayStep::Observation(pinch())], true);
        let (tx, rx) = frame_channel();
        let (results_tx, results_rx) = mpsc::channel(1);
        drop(results_rx);

        let worker = spawn_classifier(Box::new(estimator), GestureClassifier::default(), rx, results_tx);
        tx.send(frame(0));

        let stats = worker.await.unwrap().unwrap();
        assert_eq!(stats.classified, 1);
        assert!(tx.is_closed());
    }

    #[test]
    fn capture_thread_stops_at_frame_limit() {
        let (tx, rx) = frame_channel();
        let handle = spawn_capture(
            || Ok(VideoSource::synthetic(2, 2, None)),
            tx,
            CaptureSettings {
                fps: 0.0,
                max_frames: Some(5),
                ..CaptureSettings::default()
            },
        );

        let stats = handle.join().unwrap();
        assert_eq!(stats.captured, 5);
        // Nobody consumed: every frame but the last was replaced.
        assert_eq!(stats.dropped, 4);
        drop(rx);
    }

    #[test]
    fn capture_rejects_rate_too_low_for_a_frame_interval() {
        let (tx, _rx) = frame_channel();
        let handle = spawn_capture(
            || Ok(VideoSource::synthetic(2, 2, Some(1))),
            tx,
            CaptureSettings {
                fps: 1e-320,
                ..CaptureSettings::default()
            },
        );

        assert!(matches!(handle.join(), Err(PipelineError::Source(_))));
    }

    #[test]
    fn capture_reports_source_open_failure() {
        let (tx, _rx) = frame_channel();
        let handle = spawn_capture(
            || Err(anyhow::anyhow!("no camera")),
            tx,
            CaptureSettings::default(),
        );
        assert!(matches!(handle.join(), Err(PipelineError::Source(_))));
    }
}
