//! Simulated processing cost for throughput experiments
//!
//! Replaying recorded detections is far faster than running a model. These
//! wrappers charge a fixed cost to a shared [`SimulatedClock`] so a replay
//! can be paced as if it ran on the target hardware.

use crate::affinity::Affinity;
use crate::detection::Detection;
use crate::error::Result;
use image::RgbImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared, monotonically increasing virtual time
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    micros: Arc<AtomicU64>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Charges `cost` to the clock for every detection it initialises
pub struct TimedAffinity<A> {
    inner: A,
    clock: SimulatedClock,
    cost: Duration,
}

impl<A: Affinity> TimedAffinity<A> {
    pub fn new(inner: A, clock: SimulatedClock, cost: Duration) -> Self {
        Self { inner, clock, cost }
    }
}

impl<A: Affinity> Affinity for TimedAffinity<A> {
    type Data = A::Data;

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn init(&self, detection: &Detection, frame: &RgbImage, frame_no: u64) -> Result<A::Data> {
        self.clock.advance(self.cost);
        self.inner.init(detection, frame, frame_no)
    }

    fn score(&self, detection: &A::Data, track: &A::Data) -> f32 {
        self.inner.score(detection, track)
    }

    fn merge(&self, detection: A::Data, track: &mut A::Data) {
        self.inner.merge(detection, track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinities::PositionAffinity;
    use crate::bbox::Rect;

    #[test]
    fn test_init_charges_clock() {
        let clock = SimulatedClock::new();
        let timed = TimedAffinity::new(
            PositionAffinity::default(),
            clock.clone(),
            Duration::from_millis(15),
        );
        let frame = RgbImage::new(4, 4);
        let det = Detection::new(Rect::new(0.1, 0.1, 0.2, 0.2), 0.9);

        let a = timed.init(&det, &frame, 0).unwrap();
        let b = timed.init(&det, &frame, 0).unwrap();
        assert_eq!(clock.elapsed(), Duration::from_millis(30));

        // Scoring is free
        timed.score(&a, &b);
        assert_eq!(clock.elapsed(), Duration::from_millis(30));
    }
}
