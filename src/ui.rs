// src/ui.rs - egui drawing for targets, landmarks, scores and feedback
use crate::coords::{to_screen, SurfaceSize};
use crate::game::{GameState, Scoreboard, Target, TargetKind};
use crate::landmarks::{JointName, LandmarkSnapshot};
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};

#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color32,
    pub surface: Color32,
    pub pickable: Color32,
    pub bomb: Color32,
    pub hand: Color32,
    pub leg: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(20, 20, 25),
            surface: Color32::from_rgb(30, 30, 35),
            pickable: Color32::from_rgba_unmultiplied(76, 175, 80, 180),
            bomb: Color32::from_rgba_unmultiplied(244, 67, 54, 180),
            hand: Color32::from_rgb(70, 130, 240),
            leg: Color32::from_rgb(255, 152, 0),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

/// Maps game-surface pixels into the rect the game is drawn in.
pub struct SurfaceTransform {
    rect: Rect,
    scale: f32,
}

impl SurfaceTransform {
    /// Fits the surface into `rect`, preserving its aspect ratio.
    pub fn fit(rect: Rect, surface: SurfaceSize) -> Self {
        let scale = (rect.width() / surface.width as f32).min(rect.height() / surface.height as f32);
        let size = Vec2::new(surface.width as f32 * scale, surface.height as f32 * scale);
        Self {
            rect: Rect::from_center_size(rect.center(), size),
            scale,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn point(&self, p: nalgebra::Point2<f64>) -> Pos2 {
        Pos2::new(
            self.rect.left() + p.x as f32 * self.scale,
            self.rect.top() + p.y as f32 * self.scale,
        )
    }

    pub fn length(&self, l: f64) -> f32 {
        l as f32 * self.scale
    }
}

pub struct GameCanvas {
    pub theme: Theme,
}

impl GameCanvas {
    pub fn new() -> Self {
        Self { theme: Theme::default() }
    }

    pub fn draw(
        &self,
        ui: &mut egui::Ui,
        game: &GameState,
        landmarks: &LandmarkSnapshot,
        highlight: (bool, bool),
        feedback: Option<&str>,
    ) {
        let rect = ui.available_rect_before_wrap();
        let transform = SurfaceTransform::fit(rect, game.surface());
        let painter = ui.painter();

        painter.rect_filled(transform.rect(), egui::Rounding::same(8.0), self.theme.surface);

        let area = game.area();
        painter.rect_stroke(
            Rect::from_min_max(transform.point(area.min), transform.point(area.max)),
            egui::Rounding::same(4.0),
            Stroke::new(1.0, self.theme.text_secondary.gamma_multiply(0.3)),
        );

        self.draw_target(painter, &transform, game.target(TargetKind::Pickable), highlight.0);
        self.draw_target(painter, &transform, game.target(TargetKind::Bomb), highlight.1);
        self.draw_landmarks(painter, &transform, landmarks, game.surface());

        if let Some(message) = feedback {
            let pos = Pos2::new(transform.rect().center().x, transform.rect().top() + 120.0);
            let galley_rect = Rect::from_center_size(pos, Vec2::new(180.0, 36.0));
            painter.rect_filled(galley_rect, egui::Rounding::same(10.0), Color32::from_black_alpha(180));
            painter.text(
                pos,
                egui::Align2::CENTER_CENTER,
                message,
                egui::FontId::proportional(18.0),
                self.theme.text_primary,
            );
        }
    }

    fn draw_target(&self, painter: &egui::Painter, transform: &SurfaceTransform, target: &Target, highlighted: bool) {
        let (color, radius, label) = match target.kind {
            TargetKind::Pickable => (self.theme.pickable, 30.0, "Pick"),
            TargetKind::Bomb => (self.theme.bomb, 25.0, "Bomb"),
        };
        let scale = if highlighted { 1.2 } else { 1.0 };
        let center = transform.point(target.position);

        painter.circle_filled(center, transform.length(radius * scale), color);
        painter.text(
            center,
            egui::Align2::CENTER_CENTER,
            label,
            egui::FontId::proportional(14.0),
            self.theme.text_primary,
        );
    }

    fn draw_landmarks(
        &self,
        painter: &egui::Painter,
        transform: &SurfaceTransform,
        landmarks: &LandmarkSnapshot,
        surface: SurfaceSize,
    ) {
        let screen = |joint| landmarks.get(joint).map(|p| transform.point(to_screen(p, surface)));

        if let (Some(a), Some(b)) = (screen(JointName::ThumbTip), screen(JointName::IndexTip)) {
            painter.line_segment([a, b], Stroke::new(2.0, self.theme.hand));
        }
        for (from, to) in [(JointName::RightHip, JointName::RightKnee), (JointName::RightKnee, JointName::RightAnkle)] {
            if let (Some(a), Some(b)) = (screen(from), screen(to)) {
                painter.line_segment([a, b], Stroke::new(2.0, self.theme.leg));
            }
        }

        for joint in JointName::HAND.into_iter().chain(JointName::BODY) {
            if let Some(pos) = screen(joint) {
                let color = if joint.is_hand_joint() { self.theme.hand } else { self.theme.leg };
                painter.circle_filled(pos, 5.0, color);
                painter.circle_stroke(pos, 7.0, Stroke::new(2.0, self.theme.text_primary));
            }
        }
    }
}

impl Default for GameCanvas {
    fn default() -> Self {
        Self::new()
    }
}

pub fn score_cards(ui: &mut egui::Ui, theme: &Theme, scores: Scoreboard) {
    ui.horizontal(|ui| {
        score_card(ui, "Picks", scores.picks, theme.pickable, theme);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            score_card(ui, "Kicks", scores.kicks, theme.bomb, theme);
        });
    });
}

fn score_card(ui: &mut egui::Ui, title: &str, count: u32, color: Color32, theme: &Theme) {
    egui::Frame::none()
        .fill(color)
        .rounding(egui::Rounding::same(10.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new(title).small().color(theme.text_primary));
                ui.label(
                    egui::RichText::new(count.to_string())
                        .size(28.0)
                        .strong()
                        .color(theme.text_primary),
                );
            });
        });
}
