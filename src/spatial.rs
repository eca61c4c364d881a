//! Coarse 3x3 direction grid for detections.

use serde::Serialize;

use crate::detect::BoundingBox;

pub const DEFAULT_LOW_BOUND: f32 = 0.33;
pub const DEFAULT_HIGH_BOUND: f32 = 0.66;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Horizontal {
    Left,
    Middle,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Vertical {
    Up,
    Middle,
    Down,
}

impl Horizontal {
    /// Locale key for the spoken direction.
    pub fn key(self) -> &'static str {
        match self {
            Horizontal::Left => "left",
            Horizontal::Middle => "middle",
            Horizontal::Right => "right",
        }
    }
}

impl Vertical {
    /// Locale key for the spoken direction.
    pub fn key(self) -> &'static str {
        match self {
            Vertical::Up => "up",
            Vertical::Middle => "middle",
            Vertical::Down => "down",
        }
    }
}

/// Grid boundaries on both axes. Values equal to a bound fall in the outer cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BucketBounds {
    pub low: f32,
    pub high: f32,
}

impl Default for BucketBounds {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_BOUND,
            high: DEFAULT_HIGH_BOUND,
        }
    }
}

impl BucketBounds {
    pub fn horizontal(&self, xm: f32) -> Horizontal {
        if xm <= self.low {
            Horizontal::Left
        } else if xm >= self.high {
            Horizontal::Right
        } else {
            Horizontal::Middle
        }
    }

    pub fn vertical(&self, ym: f32) -> Vertical {
        if ym <= self.low {
            Vertical::Up
        } else if ym >= self.high {
            Vertical::Down
        } else {
            Vertical::Middle
        }
    }

    /// Bucket for a box, from the midpoint of its corners.
    pub fn classify(&self, b: &BoundingBox) -> DirectionBucket {
        DirectionBucket {
            horizontal: self.horizontal(b.center_x()),
            vertical: self.vertical(b.center_y()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirectionBucket {
    pub horizontal: Horizontal,
    pub vertical: Vertical,
}

impl DirectionBucket {
    pub fn new(horizontal: Horizontal, vertical: Vertical) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}
