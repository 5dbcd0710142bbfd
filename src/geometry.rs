//! Plain 2D geometry shared by the composer, the registry and the threat engine.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// A point (or offset) in scene units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn offset(&self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }

    /// Point at `distance` from self along `angle` (radians)
    pub fn polar_offset(&self, angle: f32, distance: f32) -> Point {
        Point::new(
            self.x + angle.cos() * distance,
            self.y + angle.sin() * distance,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle, used for scene bounds and exclusion regions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Zero (or negative) area. Nothing can be placed in an empty rect.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn is_well_formed(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Inclusive containment test
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x <= self.max_x() && p.y >= self.min_y() && p.y <= self.max_y()
    }

    /// Shrink by `margin` on every side. Degenerates to the center when the
    /// rect is too small to shrink.
    pub fn inset(&self, margin: f32) -> Rect {
        let w = (self.width - 2.0 * margin).max(0.0);
        let h = (self.height - 2.0 * margin).max(0.0);
        let c = self.center();
        Rect::new(c.x - w * 0.5, c.y - h * 0.5, w, h)
    }

    pub fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.min_x(), self.max_x()),
            p.y.clamp(self.min_y(), self.max_y()),
        )
    }

    /// Map a normalized [0,1]^2 coordinate into this rect
    pub fn denormalize(&self, n: Point) -> Point {
        Point::new(self.x + n.x * self.width, self.y + n.y * self.height)
    }

    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(
            self.x + rng.gen::<f32>() * self.width,
            self.y + rng.gen::<f32>() * self.height,
        )
    }
}

/// Uniform random angle in radians
pub fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>() * TAU
}

/// True when `p` lies inside any exclusion region
pub fn is_excluded(p: Point, exclusions: &[Rect]) -> bool {
    exclusions.iter().any(|r| r.contains(p))
}
