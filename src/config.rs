// src/config.rs - JSON configuration with per-section defaults
use crate::classifier::ClassifierConfig;
use crate::coords::SurfaceSize;
use crate::error::ConfigError;
use crate::estimator::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub game: GameConfig,
    pub capture: CaptureConfig,
    pub simulation: SimulationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub surface: SurfaceSize,
    /// Pixel distance from anchor landmark to target center that counts as a hit.
    pub interaction_radius: f64,
    /// Horizontal inset of the play area from each surface edge.
    pub margin_x: f64,
    /// Vertical inset of the play area from each surface edge.
    pub margin_y: f64,
    pub feedback_seconds: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceSize::default(),
            interaction_radius: 60.0,
            margin_x: 60.0,
            margin_y: 100.0,
            feedback_seconds: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub camera_index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Capacity of the classification -> game results channel.
    pub results_buffer: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            width: 640,
            height: 480,
            fps: 30.0,
            results_buffer: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub export_session: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("PickKick")))
                .unwrap_or_else(|| PathBuf::from("./output")),
            export_session: true,
        }
    }
}

impl AppConfig {
    /// Reads `path` if it exists; a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.classifier;
        if !(0.0..=1.0).contains(&c.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "classifier.confidence_threshold must be within [0, 1], got {}",
                c.confidence_threshold
            )));
        }
        positive("classifier.pick_threshold", c.pick_threshold)?;
        non_negative("classifier.kick_margin", c.kick_margin)?;

        let g = &self.game;
        positive("game.surface.width", g.surface.width)?;
        positive("game.surface.height", g.surface.height)?;
        positive("game.interaction_radius", g.interaction_radius)?;
        non_negative("game.margin_x", g.margin_x)?;
        non_negative("game.margin_y", g.margin_y)?;
        non_negative("game.feedback_seconds", g.feedback_seconds)?;

        positive("capture.fps", self.capture.fps)?;
        // At most one frame an hour.
        if 1.0 / self.capture.fps > MAX_FRAME_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "capture.fps is too low, got {}",
                self.capture.fps
            )));
        }
        if self.capture.results_buffer == 0 {
            return Err(ConfigError::Invalid("capture.results_buffer must be at least 1".into()));
        }
        Ok(())
    }
}

const MAX_FRAME_INTERVAL_SECS: f64 = 3600.0;

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be finite and positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be finite and non-negative, got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_game_constants() {
        let config = AppConfig::default();
        assert_eq!(config.classifier.confidence_threshold, 0.3);
        assert_eq!(config.classifier.pick_threshold, 0.08);
        assert_eq!(config.classifier.kick_margin, 0.15);
        assert_eq!(config.game.interaction_radius, 60.0);
        assert_eq!(config.game.feedback_seconds, 1.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{ "classifier": { "pick_threshold": 0.1 }, "game": { "surface": { "width": 1000.0, "height": 2000.0 } } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.classifier.pick_threshold, 0.1);
        assert_eq!(config.classifier.confidence_threshold, 0.3);
        assert_eq!(config.game.surface, SurfaceSize::new(1000.0, 2000.0));
        assert_eq!(config.game.margin_y, 100.0);
        assert_eq!(config.capture.fps, 30.0);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let mut config = AppConfig::default();
        config.classifier.confidence_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn non_finite_sizes_are_rejected() {
        let sizes = [
            (f64::NAN, 844.0),
            (390.0, f64::NAN),
            (f64::INFINITY, 844.0),
            (390.0, f64::INFINITY),
            (0.0, 844.0),
        ];
        for (width, height) in sizes {
            let mut config = AppConfig::default();
            config.game.surface = SurfaceSize::new(width, height);
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "surface {}x{} passed validation",
                width,
                height
            );
        }
    }

    #[test]
    fn non_finite_game_values_are_rejected() {
        let cases: [fn(&mut GameConfig); 7] = [
            |g| g.interaction_radius = f64::NAN,
            |g| g.interaction_radius = f64::INFINITY,
            |g| g.margin_x = f64::NAN,
            |g| g.margin_y = f64::INFINITY,
            |g| g.margin_x = -1.0,
            |g| g.feedback_seconds = f64::NAN,
            |g| g.feedback_seconds = -0.5,
        ];
        for apply in cases {
            let mut config = AppConfig::default();
            apply(&mut config.game);
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{:?}", config.game);
        }

        let mut config = AppConfig::default();
        config.game.margin_x = 0.0;
        config.game.feedback_seconds = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unusable_capture_rates_are_rejected() {
        for fps in [0.0, -30.0, f64::NAN, f64::INFINITY, 1e-320] {
            let mut config = AppConfig::default();
            config.capture.fps = fps;
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "fps {}", fps);
        }

        let mut config = AppConfig::default();
        config.capture.fps = 0.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("pick_kick_config_{}.json", uuid::Uuid::new_v4()));
        let mut config = AppConfig::default();
        config.game.interaction_radius = 42.0;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.game.interaction_radius, 42.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_gives_defaults_and_garbage_is_an_error() {
        let missing = std::env::temp_dir().join(format!("pick_kick_missing_{}.json", uuid::Uuid::new_v4()));
        assert!(AppConfig::load_or_default(&missing).is_ok());

        std::fs::write(&missing, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load_or_default(&missing),
            Err(ConfigError::Parse { .. })
        ));
        let _ = std::fs::remove_file(&missing);
    }
}
