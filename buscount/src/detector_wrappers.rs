//! Detector decorators used for replaying and measuring runs

use crate::detector_trait::{Detector, DetectorResult, PendingDetections};
use crate::error::DetectorError;
use crate::source::Frame;
use linetrack::affinities::SimulatedClock;
use linetrack::Detection;
use std::collections::HashMap;
use std::time::Duration;

/// Detections remembered per frame.
///
/// A stored empty list means "ran, found nothing", which is different from
/// a frame that was never stored.
#[derive(Debug, Clone, Default)]
pub struct DetectionCache {
    entries: HashMap<u64, Vec<Detection>>,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch(&self, frame_no: u64) -> Option<&[Detection]> {
        self.entries.get(&frame_no).map(Vec::as_slice)
    }

    pub fn store(&mut self, frame_no: u64, detections: &[Detection]) {
        self.entries.insert(frame_no, detections.to_vec());
    }

    pub fn clear_frame(&mut self, frame_no: u64) {
        self.entries.remove(&frame_no);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serves detections from a cache, falling back to a base detector and
/// recording its output. Results below `min_confidence` are filtered out.
pub struct CachedDetector {
    base: Option<Box<dyn Detector>>,
    cache: DetectionCache,
    min_confidence: f32,
}

impl CachedDetector {
    /// Cache in front of `base`
    pub fn new<D: Detector + 'static>(cache: DetectionCache, base: D, min_confidence: f32) -> Self {
        Self {
            base: Some(Box::new(base)),
            cache,
            min_confidence,
        }
    }

    /// Replay only, a frame missing from the cache is an error
    pub fn reader(cache: DetectionCache, min_confidence: f32) -> Self {
        Self {
            base: None,
            cache,
            min_confidence,
        }
    }

    pub fn cache(&self) -> &DetectionCache {
        &self.cache
    }

    pub fn into_cache(self) -> DetectionCache {
        self.cache
    }
}

impl Detector for CachedDetector {
    fn name(&self) -> &str {
        "cached"
    }

    fn process(&mut self, frame: &Frame) -> DetectorResult {
        let detections = match self.cache.fetch(frame.frame_no) {
            Some(hit) => hit.to_vec(),
            None => match self.base.as_mut() {
                Some(base) => {
                    let fresh = base.process(frame)?;
                    self.cache.store(frame.frame_no, &fresh);
                    fresh
                }
                None => {
                    log::warn!("Frame {} not present in detection cache", frame.frame_no);
                    return Err(DetectorError::new(
                        "cached",
                        format!("Frame not known: {}", frame.frame_no),
                    ));
                }
            },
        };

        Ok(detections
            .into_iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .collect())
    }
}

/// Charges a fixed simulated cost per frame to a shared clock
pub struct TimedDetector<D> {
    inner: D,
    clock: SimulatedClock,
    cost: Duration,
}

impl<D: Detector> TimedDetector<D> {
    pub fn new(inner: D, clock: SimulatedClock, cost: Duration) -> Self {
        Self { inner, clock, cost }
    }
}

impl<D: Detector> Detector for TimedDetector<D> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn process(&mut self, frame: &Frame) -> DetectorResult {
        self.clock.advance(self.cost);
        self.inner.process(frame)
    }

    fn start_async(&mut self, frame: &Frame) -> PendingDetections {
        self.clock.advance(self.cost);
        self.inner.start_async(frame)
    }
}
