// src/game.rs - Targets, hit checks, scores and feedback
use crate::classifier::Classification;
use crate::config::GameConfig;
use crate::coords::{to_screen, SurfaceSize};
use crate::landmarks::JointName;
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Green object, collected with a pinch of thumb and index finger.
    Pickable,
    /// Red bomb, hit with the right foot.
    Bomb,
}

impl TargetKind {
    /// Landmark whose screen position is compared against the target.
    pub fn anchor(&self) -> JointName {
        match self {
            TargetKind::Pickable => JointName::ThumbTip,
            TargetKind::Bomb => JointName::RightAnkle,
        }
    }

    pub fn hit_message(&self) -> &'static str {
        match self {
            TargetKind::Pickable => "Great Pick! +1",
            TargetKind::Bomb => "Nice Kick! +1",
        }
    }

    fn initial_position(&self) -> Point2<f64> {
        match self {
            TargetKind::Pickable => Point2::new(200.0, 300.0),
            TargetKind::Bomb => Point2::new(100.0, 500.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Target {
    pub kind: TargetKind,
    pub position: Point2<f64>,
}

/// Rectangle (inclusive) in which targets are placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayArea {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl PlayArea {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    /// Insets the surface by the margins. An axis too short for its margins
    /// collapses to the surface center on that axis.
    pub fn for_surface(surface: SurfaceSize, margin_x: f64, margin_y: f64) -> Self {
        let (min_x, max_x) = inset(surface.width, margin_x);
        let (min_y, max_y) = inset(surface.height, margin_y);
        Self::new(Point2::new(min_x, min_y), Point2::new(max_x, max_y))
    }

    pub fn contains(&self, p: Point2<f64>) -> bool {
        (self.min.x..=self.max.x).contains(&p.x) && (self.min.y..=self.max.y).contains(&p.y)
    }

    pub fn clamp(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Point2<f64> {
        Point2::new(
            rng.gen_range(self.min.x..=self.max.x),
            rng.gen_range(self.min.y..=self.max.y),
        )
    }
}

fn inset(length: f64, margin: f64) -> (f64, f64) {
    if length - 2.0 * margin >= 0.0 {
        (margin, length - margin)
    } else {
        (length / 2.0, length / 2.0)
    }
}

/// Strictly inside the interaction radius.
pub fn is_hit(anchor: Point2<f64>, target: Point2<f64>, radius: f64) -> bool {
    nalgebra::distance(&anchor, &target) < radius
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Scoreboard {
    pub picks: u32,
    pub kicks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub message: String,
    pub expires_at: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitEvent {
    pub kind: TargetKind,
    pub frame_index: u64,
    pub timestamp: f64,
    pub anchor: Point2<f64>,
    pub distance: f64,
    pub previous_position: Point2<f64>,
    pub new_position: Point2<f64>,
}

/// Game state owned by the consumer of classifications.
pub struct GameState {
    config: GameConfig,
    area: PlayArea,
    pickable: Target,
    bomb: Target,
    scores: Scoreboard,
    feedback: Option<Feedback>,
    pick_was_detected: bool,
    kick_was_detected: bool,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: GameConfig, seed: Option<u64>) -> Self {
        let area = PlayArea::for_surface(config.surface, config.margin_x, config.margin_y);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let place = |kind: TargetKind| Target {
            kind,
            position: area.clamp(kind.initial_position()),
        };

        Self {
            pickable: place(TargetKind::Pickable),
            bomb: place(TargetKind::Bomb),
            config,
            area,
            scores: Scoreboard::default(),
            feedback: None,
            pick_was_detected: false,
            kick_was_detected: false,
            rng,
        }
    }

    pub fn scores(&self) -> Scoreboard {
        self.scores
    }

    pub fn area(&self) -> PlayArea {
        self.area
    }

    pub fn surface(&self) -> SurfaceSize {
        self.config.surface
    }

    pub fn target(&self, kind: TargetKind) -> &Target {
        match kind {
            TargetKind::Pickable => &self.pickable,
            TargetKind::Bomb => &self.bomb,
        }
    }

    pub fn set_target_position(&mut self, kind: TargetKind, position: Point2<f64>) {
        self.target_mut(kind).position = position;
    }

    fn target_mut(&mut self, kind: TargetKind) -> &mut Target {
        match kind {
            TargetKind::Pickable => &mut self.pickable,
            TargetKind::Bomb => &mut self.bomb,
        }
    }

    /// Feedback text still on screen at `now` (seconds, same clock as the
    /// classification timestamps).
    pub fn feedback_at(&self, now: f64) -> Option<&str> {
        self.feedback
            .as_ref()
            .filter(|f| now < f.expires_at)
            .map(|f| f.message.as_str())
    }

    /// Feeds one classification into the game. Each gesture is checked when
    /// its flag switches on, not on every frame it stays on.
    pub fn apply(&mut self, classification: &Classification) -> Vec<HitEvent> {
        let mut hits = Vec::new();

        if classification.pick_detected && !self.pick_was_detected {
            hits.extend(self.check_gesture(TargetKind::Pickable, classification));
        }
        if classification.kick_detected && !self.kick_was_detected {
            hits.extend(self.check_gesture(TargetKind::Bomb, classification));
        }

        self.pick_was_detected = classification.pick_detected;
        self.kick_was_detected = classification.kick_detected;
        hits
    }

    fn check_gesture(&mut self, kind: TargetKind, classification: &Classification) -> Option<HitEvent> {
        let landmark = classification.landmarks.get(kind.anchor())?;
        let anchor = to_screen(landmark, self.config.surface);
        let previous_position = self.target(kind).position;
        let distance = nalgebra::distance(&anchor, &previous_position);

        if !is_hit(anchor, previous_position, self.config.interaction_radius) {
            debug!(
                "{:?} gesture at ({:.0}, {:.0}) missed target by {:.1}px",
                kind, anchor.x, anchor.y, distance
            );
            return None;
        }

        match kind {
            TargetKind::Pickable => self.scores.picks += 1,
            TargetKind::Bomb => self.scores.kicks += 1,
        }
        self.feedback = Some(Feedback {
            message: kind.hit_message().to_string(),
            expires_at: classification.timestamp + self.config.feedback_seconds,
        });

        let new_position = self.area.random_position(&mut self.rng);
        self.target_mut(kind).position = new_position;

        info!(
            "{} (picks: {}, kicks: {})",
            kind.hit_message(),
            self.scores.picks,
            self.scores.kicks
        );

        Some(HitEvent {
            kind,
            frame_index: classification.frame_index,
            timestamp: classification.timestamp,
            anchor,
            distance,
            previous_position,
            new_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FrameOutcome;
    use crate::coords::to_normalized;
    use crate::landmarks::LandmarkSnapshot;

    fn config() -> GameConfig {
        GameConfig {
            surface: SurfaceSize::new(1000.0, 2000.0),
            ..GameConfig::default()
        }
    }

    fn classification(
        index: u64,
        pick: Option<Point2<f64>>,
        kick: Option<Point2<f64>>,
        surface: SurfaceSize,
    ) -> Classification {
        let mut landmarks = LandmarkSnapshot::default();
        if let Some(screen) = pick {
            landmarks.hand.insert(JointName::ThumbTip, to_normalized(screen, surface));
        }
        if let Some(screen) = kick {
            landmarks.body.insert(JointName::RightAnkle, to_normalized(screen, surface));
        }
        Classification {
            frame_index: index,
            timestamp: index as f64 / 30.0,
            pick_detected: pick.is_some(),
            kick_detected: kick.is_some(),
            landmarks,
            outcome: FrameOutcome::Processed,
        }
    }

    #[test]
    fn hit_radius_is_strict() {
        let target = Point2::new(100.0, 100.0);
        assert!(is_hit(Point2::new(159.9, 100.0), target, 60.0));
        assert!(!is_hit(Point2::new(160.0, 100.0), target, 60.0));
        assert!(!is_hit(Point2::new(136.0, 148.0), target, 60.0));
    }

    #[test]
    fn play_area_insets_surface() {
        let area = PlayArea::for_surface(SurfaceSize::new(1000.0, 2000.0), 60.0, 100.0);
        assert_eq!(area.min, Point2::new(60.0, 100.0));
        assert_eq!(area.max, Point2::new(940.0, 1900.0));
        assert!(area.contains(Point2::new(60.0, 1900.0)));
        assert!(!area.contains(Point2::new(59.9, 500.0)));
    }

    #[test]
    fn tiny_surface_collapses_to_center() {
        let area = PlayArea::for_surface(SurfaceSize::new(100.0, 150.0), 60.0, 100.0);
        assert_eq!(area.min, Point2::new(50.0, 75.0));
        assert_eq!(area.max, area.min);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(area.random_position(&mut rng), Point2::new(50.0, 75.0));
    }

    #[test]
    fn random_positions_stay_inside_area() {
        let area = PlayArea::for_surface(SurfaceSize::new(390.0, 844.0), 60.0, 100.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(area.contains(area.random_position(&mut rng)));
        }
    }

    #[test]
    fn pick_near_target_scores_and_relocates() {
        let config = config();
        let surface = config.surface;
        let mut game = GameState::new(config, Some(3));
        let start = game.target(TargetKind::Pickable).position;
        assert_eq!(start, Point2::new(200.0, 300.0));

        let hits = game.apply(&classification(1, Some(Point2::new(220.0, 310.0)), None, surface));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, TargetKind::Pickable);
        assert_eq!(hits[0].previous_position, start);
        assert_eq!(game.scores(), Scoreboard { picks: 1, kicks: 0 });

        let moved = game.target(TargetKind::Pickable).position;
        assert_eq!(moved, hits[0].new_position);
        assert!(game.area().contains(moved));
        assert_eq!(game.feedback_at(1.0 / 30.0), Some("Great Pick! +1"));
    }

    #[test]
    fn gesture_far_from_target_misses() {
        let config = config();
        let surface = config.surface;
        let mut game = GameState::new(config, Some(3));

        let hits = game.apply(&classification(1, None, Some(Point2::new(800.0, 1500.0)), surface));
        assert!(hits.is_empty());
        assert_eq!(game.scores(), Scoreboard::default());
        assert_eq!(game.target(TargetKind::Bomb).position, Point2::new(100.0, 500.0));
        assert_eq!(game.feedback_at(0.0), None);
    }

    #[test]
    fn kick_hits_bomb() {
        let config = config();
        let surface = config.surface;
        let mut game = GameState::new(config, Some(11));

        let hits = game.apply(&classification(4, None, Some(Point2::new(100.0, 540.0)), surface));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, TargetKind::Bomb);
        assert_eq!(game.scores().kicks, 1);
        assert_eq!(game.feedback_at(hits[0].timestamp), Some("Nice Kick! +1"));
    }

    #[test]
    fn held_gesture_is_checked_once() {
        let config = config();
        let surface = config.surface;
        let mut game = GameState::new(config, Some(5));

        let first = game.apply(&classification(1, Some(Point2::new(200.0, 300.0)), None, surface));
        assert_eq!(first.len(), 1);

        // Still pinching, now right over the relocated target: no new check.
        let target = game.target(TargetKind::Pickable).position;
        let held = game.apply(&classification(2, Some(target), None, surface));
        assert!(held.is_empty());

        // Release, then pinch again.
        game.apply(&classification(3, None, None, surface));
        let again = game.apply(&classification(4, Some(target), None, surface));
        assert_eq!(again.len(), 1);
        assert_eq!(game.scores().picks, 2);
    }

    #[test]
    fn feedback_expires() {
        let config = config();
        let surface = config.surface;
        let mut game = GameState::new(config, Some(5));
        game.apply(&classification(30, Some(Point2::new(200.0, 300.0)), None, surface));

        assert_eq!(game.feedback_at(1.0), Some("Great Pick! +1"));
        assert_eq!(game.feedback_at(2.49), Some("Great Pick! +1"));
        assert_eq!(game.feedback_at(2.5), None);
    }

    #[test]
    fn detection_without_anchor_landmark_is_ignored() {
        let mut game = GameState::new(config(), Some(5));
        let bare = Classification {
            pick_detected: true,
            ..Classification::nothing_detected(0, 0.0, FrameOutcome::Processed)
        };
        assert!(game.apply(&bare).is_empty());
    }
}
