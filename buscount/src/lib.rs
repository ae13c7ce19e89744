//! Bus Passenger Counting Pipeline
//!
//! Counts people crossing a line in a video stream. Frames flow from a
//! [`FrameSource`] through a [`Detector`] into the [`linetrack`] association
//! engine, and annotated frames come out on the calling thread together with
//! the running in/out totals.

pub mod config;
pub mod counter;
pub mod detector_trait;
pub mod detector_wrappers;
pub mod error;
pub mod frame_executor;
pub mod image_utils;
pub mod mot_detector;
pub mod source;
pub mod tick_counter;
pub mod video_sync;

mod admission;

pub use config::{CounterConfig, RunStyle};
pub use counter::{BusCounter, EventListener, ProcessedFrame, RunStats, StopHandle, WorldHandle};
pub use detector_trait::{Detector, DetectorResult, FixedDetector, PendingDetections};
pub use detector_wrappers::{CachedDetector, DetectionCache, TimedDetector};
pub use error::{CounterError, DetectorError, Result};
pub use frame_executor::DetectorExecutor;
pub use mot_detector::MotDetector;
pub use source::{Frame, FrameSource, ImageSequence};
pub use tick_counter::TickCounter;
pub use video_sync::VideoSync;

pub use linetrack::{Counts, Event, Line, WorldConfig};

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
