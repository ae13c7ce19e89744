//! Real time pacing of a frame source
//!
//! When processing is slower than the video frame rate, reading frames one
//! by one falls further and further behind. `VideoSync` measures how long
//! the caller took since earlier calls and skips as many source frames as
//! needed to stay on schedule.

use crate::source::{Frame, FrameSource};
use linetrack::affinities::SimulatedClock;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of calls timing is averaged over by default
pub const DEFAULT_AVERAGING: usize = 10;

#[derive(Debug, Clone)]
enum TimeSource {
    Wall(Instant),
    Simulated(SimulatedClock),
}

impl TimeSource {
    fn elapsed(&self) -> Duration {
        match self {
            TimeSource::Wall(start) => start.elapsed(),
            TimeSource::Simulated(clock) => clock.elapsed(),
        }
    }
}

/// Frame source wrapper that drops frames to keep up with `src_fps`
pub struct VideoSync<S> {
    source: S,
    src_fps: f32,
    averaging: usize,
    time: TimeSource,
    /// (time of call, frames read so far) for the most recent calls
    history: VecDeque<(Duration, u64)>,
    frames_read: u64,
    frames_skipped: u64,
}

impl<S: FrameSource> VideoSync<S> {
    pub fn new(source: S, src_fps: f32) -> Self {
        Self {
            source,
            src_fps,
            averaging: DEFAULT_AVERAGING,
            time: TimeSource::Wall(Instant::now()),
            history: VecDeque::with_capacity(DEFAULT_AVERAGING + 1),
            frames_read: 0,
            frames_skipped: 0,
        }
    }

    pub fn with_averaging(mut self, averaging: usize) -> Self {
        self.averaging = averaging.max(1);
        self
    }

    /// Measure time with a simulated clock instead of the wall clock
    pub fn with_clock(mut self, clock: SimulatedClock) -> Self {
        self.time = TimeSource::Simulated(clock);
        self
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Read the next frame, skipping frames if behind schedule
    pub fn next(&mut self) -> Option<Frame> {
        let now = self.time.elapsed();
        self.next_at(now)
    }

    /// Like [`VideoSync::next`] with `now` measured from an arbitrary epoch
    pub fn next_at(&mut self, now: Duration) -> Option<Frame> {
        let mut catchup = 1_i64;
        if let Some(&(then, read_then)) = self.history.front() {
            let elapsed = now.saturating_sub(then).as_secs_f32();
            let processed = (self.frames_read - read_then) as f32;
            let must_read = self.src_fps * elapsed - processed;
            catchup = (must_read.round() as i64).max(1);
        }

        let mut frame = None;
        for i in 0..catchup {
            self.frames_read += 1;
            frame = self.source.next_frame();
            if frame.is_none() {
                break;
            }
            if i > 0 {
                self.frames_skipped += 1;
            }
        }
        if catchup > 1 {
            log::debug!(
                "Video sync: read {} frames to catch up ({} skipped in total)",
                catchup,
                self.frames_skipped
            );
        }

        self.history.push_back((now, self.frames_read));
        while self.history.len() > self.averaging {
            self.history.pop_front();
        }
        frame
    }
}

impl<S: FrameSource> FrameSource for VideoSync<S> {
    fn next_frame(&mut self) -> Option<Frame> {
        self.next()
    }
}
