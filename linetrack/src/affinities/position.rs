//! Constant velocity position prediction

use crate::affinity::Affinity;
use crate::bbox::Rect;
use crate::detection::Detection;
use crate::error::Result;
use crate::geom::Point;
use image::RgbImage;

/// Smoothing factor applied to the velocity estimate on every merge
const SPEED_ALPHA: f32 = 0.5;

/// Last known location and smoothed per-frame velocity of a box
#[derive(Debug, Clone, PartialEq)]
pub struct PositionData {
    pub loc: Rect,
    pub speed: Point,
}

/// Scores a detection by how close it is to where the track is expected
/// to be next frame.
///
/// The acceptance radius scales with the track's box area, so a score of 1
/// means a perfect prediction and anything outside `area * scale` squared
/// distance goes negative.
#[derive(Debug, Clone)]
pub struct PositionAffinity {
    scale: f32,
}

impl PositionAffinity {
    pub fn new(scale: f32) -> Self {
        Self { scale }
    }
}

impl Default for PositionAffinity {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl Affinity for PositionAffinity {
    type Data = PositionData;

    fn name(&self) -> &str {
        "position"
    }

    fn init(
        &self,
        detection: &Detection,
        _frame: &RgbImage,
        _frame_no: u64,
    ) -> Result<PositionData> {
        Ok(PositionData {
            loc: detection.bbox,
            speed: Point::default(),
        })
    }

    fn score(&self, detection: &PositionData, track: &PositionData) -> f32 {
        let expected = track.loc.top_left() + track.speed;
        let dist = detection.loc.top_left().distance_sq(expected);
        let thresh = track.loc.area() * self.scale;
        if thresh <= 0.0 {
            return 0.0;
        }
        (thresh - dist) / thresh
    }

    fn merge(&self, detection: PositionData, track: &mut PositionData) {
        let observed = detection.loc.top_left() - track.loc.top_left();
        track.speed = track.speed * SPEED_ALPHA + observed * (1.0 - SPEED_ALPHA);
        track.loc = detection.loc;
    }
}
