//! Normalized bounding boxes and IoU calculations

use crate::geom::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis aligned box in normalized `[0, 1]` image coordinates
///
/// `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Pixel rectangle clipped to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
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

    /// Build from a pixel box on a `frame_width x frame_height` frame
    pub fn from_pixels(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let fw = frame_width.max(1) as f32;
        let fh = frame_height.max(1) as f32;
        Self::new(x / fw, y / fh, width / fw, height / fh)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Point used for every line test: horizontally centred, a quarter of
    /// the way down the box.
    ///
    /// Crossing lines are calibrated against this point, so it must not be
    /// swapped for the centroid or the foot point.
    pub fn anchor(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 4.0)
    }

    /// Overlapping region, or `None` when the boxes are disjoint
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Intersection over union, 0 for disjoint boxes
    pub fn iou(&self, other: &Rect) -> f32 {
        let intersection = match self.intersection(other) {
            Some(r) => r.area(),
            None => return 0.0,
        };
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    /// Convert to pixels on a `frame_width x frame_height` frame, clipped to
    /// the frame. Returns `None` when less than one pixel remains.
    pub fn to_pixels(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        let fw = frame_width as f32;
        let fh = frame_height as f32;

        let x1 = (self.x * fw).round().clamp(0.0, fw);
        let y1 = (self.y * fh).round().clamp(0.0, fh);
        let x2 = (self.right() * fw).round().clamp(0.0, fw);
        let y2 = (self.bottom() * fh).round().clamp(0.0, fh);

        if x2 - x1 < 1.0 || y2 - y1 < 1.0 {
            return None;
        }

        Some(PixelRect {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({:.3}, {:.3}, {:.3}x{:.3})",
            self.x, self.y, self.width, self.height
        )
    }
}
