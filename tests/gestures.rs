//! Gesture classification and target hits through the public API

use nalgebra::Point2;
use pick_kick::config::GameConfig;
use pick_kick::coords::to_normalized;
use pick_kick::{
    to_screen, ClassifierConfig, EstimatorError, GameState, GestureClassifier, JointName,
    JointObservation, LandmarkPoint, PoseObservation, SurfaceSize, TargetKind,
};

fn hand(thumb: (f64, f64), index: (f64, f64), confidence: f64) -> JointObservation {
    JointObservation::new()
        .with(JointName::ThumbTip, LandmarkPoint::new(thumb.0, thumb.1, confidence))
        .with(JointName::IndexTip, LandmarkPoint::new(index.0, index.1, confidence))
}

fn leg(ankle_y: f64, knee_y: f64, hip_y: f64) -> JointObservation {
    leg_with_confidence(ankle_y, knee_y, hip_y, [0.9, 0.9, 0.9])
}

/// Confidences are `[ankle, knee, hip]`.
fn leg_with_confidence(ankle_y: f64, knee_y: f64, hip_y: f64, confidence: [f64; 3]) -> JointObservation {
    JointObservation::new()
        .with(JointName::RightAnkle, LandmarkPoint::new(0.5, ankle_y, confidence[0]))
        .with(JointName::RightKnee, LandmarkPoint::new(0.5, knee_y, confidence[1]))
        .with(JointName::RightHip, LandmarkPoint::new(0.5, hip_y, confidence[2]))
}

#[test]
fn test_default_classifier_config() {
    let config = ClassifierConfig::default();
    assert_eq!(config.confidence_threshold, 0.3);
    assert_eq!(config.pick_threshold, 0.08);
    assert_eq!(config.kick_margin, 0.15);
}

#[test]
fn test_pick_and_kick_in_the_same_frame() {
    let classifier = GestureClassifier::default();
    let observation = PoseObservation {
        hand: Some(hand((0.4, 0.5), (0.42, 0.5), 0.9)),
        body: Some(leg(0.2, 0.5, 0.5)),
    };

    let result = classifier.classify(3, 0.1, Ok(observation));
    assert!(result.pick_detected);
    assert!(result.kick_detected);
    assert_eq!(result.frame_index, 3);
    assert!(result.landmarks.get(JointName::ThumbTip).is_some());
    assert!(result.landmarks.get(JointName::RightHip).is_some());
}

#[test]
fn test_low_confidence_hand_is_ignored() {
    let classifier = GestureClassifier::default();
    let observation = PoseObservation {
        hand: Some(hand((0.4, 0.5), (0.4, 0.5), 0.1)),
        body: None,
    };

    let result = classifier.classify(0, 0.0, Ok(observation));
    assert!(!result.pick_detected);
    assert!(result.landmarks.is_empty());
}

#[test]
fn test_low_confidence_knee_or_hip_blocks_a_kick() {
    let classifier = GestureClassifier::default();

    for confidence in [[0.9, 0.29, 0.9], [0.9, 0.9, 0.29]] {
        let observation = PoseObservation {
            hand: None,
            body: Some(leg_with_confidence(0.2, 0.5, 0.5, confidence)),
        };
        let result = classifier.classify(0, 0.0, Ok(observation));
        assert!(!result.kick_detected, "confidences {:?}", confidence);
    }
}

#[test]
fn test_low_confidence_index_tip_blocks_a_pick() {
    let classifier = GestureClassifier::default();
    let observation = PoseObservation {
        hand: Some(
            JointObservation::new()
                .with(JointName::ThumbTip, LandmarkPoint::new(0.4, 0.5, 0.9))
                .with(JointName::IndexTip, LandmarkPoint::new(0.42, 0.5, 0.29)),
        ),
        body: None,
    };

    let result = classifier.classify(0, 0.0, Ok(observation));
    assert!(!result.pick_detected);
    assert!(result.landmarks.get(JointName::ThumbTip).is_none());
}

#[test]
fn test_estimator_error_yields_nothing_detected() {
    let classifier = GestureClassifier::default();
    let result = classifier.classify(9, 0.3, Err(EstimatorError::Backend("timeout".into())));

    assert!(result.is_failure());
    assert!(!result.pick_detected);
    assert!(!result.kick_detected);
    assert!(result.landmarks.is_empty());
}

#[test]
fn test_screen_mapping_flips_the_vertical_axis() {
    let surface = SurfaceSize::new(1000.0, 2000.0);

    assert_eq!(to_screen(Point2::new(0.0, 0.0), surface), Point2::new(0.0, 2000.0));
    assert_eq!(to_screen(Point2::new(1.0, 1.0), surface), Point2::new(1000.0, 0.0));
    assert_eq!(to_screen(Point2::new(0.5, 0.25), surface), Point2::new(500.0, 1500.0));

    let back = to_normalized(Point2::new(500.0, 1500.0), surface);
    assert!((back.x - 0.5).abs() < 1e-12);
    assert!((back.y - 0.25).abs() < 1e-12);
}

#[test]
fn test_kick_on_bomb_scores_and_moves_it() {
    let mut game = GameState::new(GameConfig::default(), Some(11));
    let surface = game.surface();
    let bomb = game.target(TargetKind::Bomb).position;
    let ankle = to_normalized(bomb, surface);

    let classifier = GestureClassifier::default();
    let observation = PoseObservation {
        hand: None,
        body: Some(
            JointObservation::new()
                .with(JointName::RightAnkle, LandmarkPoint::new(ankle.x, ankle.y, 0.9))
                .with(JointName::RightKnee, LandmarkPoint::new(ankle.x, ankle.y + 0.3, 0.9))
                .with(JointName::RightHip, LandmarkPoint::new(ankle.x, ankle.y + 0.4, 0.9)),
        ),
    };

    let classification = classifier.classify(0, 1.0, Ok(observation));
    assert!(classification.kick_detected);

    let hits = game.apply(&classification);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, TargetKind::Bomb);
    assert_eq!(game.scores().kicks, 1);
    assert_eq!(game.scores().picks, 0);
    assert!(game.area().contains(game.target(TargetKind::Bomb).position));
    assert_eq!(game.feedback_at(1.0), Some("Nice Kick! +1"));
    assert_eq!(game.feedback_at(3.0), None);
}
