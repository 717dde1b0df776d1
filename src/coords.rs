// src/coords.rs - Normalized (bottom-left origin) <-> surface pixel coordinates
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Pixel size of the surface the targets are drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        // Portrait phone screen in points.
        Self::new(390.0, 844.0)
    }
}

/// Maps a normalized landmark onto the surface. The estimator's vertical axis
/// points up, the surface's points down.
pub fn to_screen(normalized: Point2<f64>, surface: SurfaceSize) -> Point2<f64> {
    Point2::new(
        normalized.x * surface.width,
        (1.0 - normalized.y) * surface.height,
    )
}

pub fn to_normalized(screen: Point2<f64>, surface: SurfaceSize) -> Point2<f64> {
    Point2::new(
        screen.x / surface.width,
        1.0 - screen.y / surface.height,
    )
}
