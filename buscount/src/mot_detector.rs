//! Detector replaying a MOT challenge detections file
//!
//! Every non-empty line is `frame,id,x,y,w,h,conf,x,y,z` with the box in
//! pixels and frames counted from one. Only the frame, box and confidence
//! are used.

use crate::detector_trait::{Detector, DetectorResult};
use crate::error::DetectorError;
use crate::source::Frame;
use linetrack::{Detection, Rect};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const NAME: &str = "mot";
const FIELDS: usize = 10;

/// Box in pixels as read from the file
#[derive(Debug, Clone, Copy)]
struct RawDetection {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    confidence: f32,
}

/// Replays recorded detections instead of running a model
#[derive(Debug, Clone)]
pub struct MotDetector {
    threshold: f32,
    conf_scale: f32,
    first_frame: u64,
    entries: HashMap<u64, Vec<RawDetection>>,
}

impl MotDetector {
    /// `threshold` is in `[0, 1]`, file confidences are divided by
    /// `conf_scale` (100 for MOT files scored in percent)
    pub fn new(threshold: f32, conf_scale: f32) -> Self {
        Self {
            threshold,
            conf_scale,
            first_frame: 1,
            entries: HashMap::new(),
        }
    }

    /// File frame number that corresponds to pipeline frame 0
    pub fn with_first_frame(mut self, first_frame: u64) -> Self {
        self.first_frame = first_frame;
        self
    }

    /// Replace the loaded detections with the contents of a file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), DetectorError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            DetectorError::new(NAME, format!("cannot read {}: {}", path.display(), e))
        })?;
        self.load_str(&text)?;
        log::info!(
            "Loaded MOT detections for {} frames from {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Replace the loaded detections with the parsed `text`
    pub fn load_str(&mut self, text: &str) -> Result<(), DetectorError> {
        self.entries.clear();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (frame, raw) = parse_line(line, i + 1)?;
            if raw.confidence < self.threshold * self.conf_scale {
                continue;
            }
            self.entries.entry(frame).or_default().push(raw);
        }
        Ok(())
    }

    pub fn frame_count(&self) -> usize {
        self.entries.len()
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<(u64, RawDetection), DetectorError> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() != FIELDS {
        return Err(DetectorError::new(
            NAME,
            format!(
                "line {}: expected exactly {} fields, found {}",
                line_no,
                FIELDS,
                parts.len()
            ),
        ));
    }

    let number = |idx: usize| -> Result<f32, DetectorError> {
        parts[idx].parse::<f32>().map_err(|_| {
            DetectorError::new(NAME, format!("line {}: '{}' is not a number", line_no, parts[idx]))
        })
    };

    let frame = parts[0].parse::<u64>().map_err(|_| {
        DetectorError::new(NAME, format!("line {}: bad frame '{}'", line_no, parts[0]))
    })?;
    let raw = RawDetection {
        x: number(2)?,
        y: number(3)?,
        width: number(4)?,
        height: number(5)?,
        confidence: number(6)?,
    };
    Ok((frame, raw))
}

impl Detector for MotDetector {
    fn name(&self) -> &str {
        NAME
    }

    fn process(&mut self, frame: &Frame) -> DetectorResult {
        let key = frame.frame_no + self.first_frame;
        let (w, h) = (frame.width(), frame.height());
        let detections = self
            .entries
            .get(&key)
            .map(|raw| {
                raw.iter()
                    .map(|d| {
                        Detection::new(
                            Rect::from_pixels(d.x, d.y, d.width, d.height, w, h),
                            d.confidence / self.conf_scale,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(detections)
    }
}
