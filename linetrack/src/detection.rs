//! Per-frame detector output

use crate::bbox::Rect;
use serde::{Deserialize, Serialize};

/// A single detection produced by an external detector
///
/// Detections only live for the frame they were produced in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: Rect,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: Rect, confidence: f32) -> Self {
        Self { bbox, confidence }
    }
}
