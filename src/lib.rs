// src/lib.rs
pub mod app;
pub mod classifier;
pub mod config;
pub mod coords;
pub mod error;
pub mod estimator;
pub mod game;
pub mod landmarks;
pub mod pipeline;
pub mod session;
pub mod video;

#[cfg(feature = "gui")]
pub mod ui;

pub use classifier::{Classification, ClassifierConfig, FrameOutcome, GestureClassifier};
pub use config::AppConfig;
pub use coords::{to_screen, SurfaceSize};
pub use error::{ConfigError, EstimatorError, PipelineError};
pub use estimator::{PoseEstimator, ReplayEstimator, SimulatedEstimator};
pub use game::{GameState, HitEvent, PlayArea, Scoreboard, TargetKind};
pub use landmarks::{JointName, JointObservation, LandmarkPoint, LandmarkSnapshot, PoseObservation};
