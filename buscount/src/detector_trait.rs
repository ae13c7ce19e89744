//! Unified detector contract used by the counting pipeline
//!
//! A detector turns a frame into normalized person boxes. Detectors that can
//! overlap work with the caller override [`Detector::start_async`] and hand
//! back a [`PendingDetections::Waiting`]; everything else runs synchronously.

use crate::error::DetectorError;
use crate::source::Frame;
use crossbeam::channel::Receiver;
use linetrack::Detection;

/// Outcome of a detector call
pub type DetectorResult = Result<Vec<Detection>, DetectorError>;

/// Common interface for person detectors
pub trait Detector: Send {
    /// Detector name (for logging/debugging)
    fn name(&self) -> &str;

    /// Detect people in a single frame
    fn process(&mut self, frame: &Frame) -> DetectorResult;

    /// Submit a frame and return a handle to await the result.
    ///
    /// The default runs [`Detector::process`] immediately.
    fn start_async(&mut self, frame: &Frame) -> PendingDetections {
        PendingDetections::Ready(self.process(frame))
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process(&mut self, frame: &Frame) -> DetectorResult {
        (**self).process(frame)
    }

    fn start_async(&mut self, frame: &Frame) -> PendingDetections {
        (**self).start_async(frame)
    }
}

/// Handle returned by [`Detector::start_async`]
pub enum PendingDetections {
    /// The result is already known
    Ready(DetectorResult),
    /// The result will arrive on the channel
    Waiting {
        detector: String,
        response_rx: Receiver<DetectorResult>,
    },
}

impl PendingDetections {
    /// Block until the detections are available
    pub fn wait(self) -> DetectorResult {
        match self {
            PendingDetections::Ready(result) => result,
            PendingDetections::Waiting {
                detector,
                response_rx,
            } => response_rx
                .recv()
                .map_err(|_| DetectorError::new(detector, "worker dropped the request"))?,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PendingDetections::Ready(_))
    }
}

/// Detector that always returns the same detections
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    pub detections: Vec<Detection>,
}

impl Detector for FixedDetector {
    fn name(&self) -> &str {
        "fixed"
    }

    fn process(&mut self, _frame: &Frame) -> DetectorResult {
        Ok(self.detections.clone())
    }
}
