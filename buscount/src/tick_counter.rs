//! Moving average rate counter

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Default)]
struct TickState {
    times: VecDeque<Instant>,
    fps: Option<f32>,
}

/// Counts ticks per second over the last `window` ticks.
///
/// Safe to tick from several threads at once.
#[derive(Debug)]
pub struct TickCounter {
    window: usize,
    state: Mutex<TickState>,
}

impl TickCounter {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            state: Mutex::new(TickState::default()),
        }
    }

    /// Record a tick now and return the updated rate
    pub fn tick(&self) -> Option<f32> {
        self.tick_at(Instant::now())
    }

    /// Record a tick at `now`. The first tick has no rate yet.
    pub fn tick_at(&self, now: Instant) -> Option<f32> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.times.push_back(now);
        if state.times.len() > self.window {
            state.times.pop_front();
        }

        let oldest = *state.times.front()?;
        // Measured from the end of the oldest tick, whose own duration is unknown
        let intervals = state.times.len() - 1;
        let seconds = now.saturating_duration_since(oldest).as_secs_f32();
        if intervals == 0 || seconds <= 0.0 {
            return state.fps;
        }
        state.fps = Some(intervals as f32 / seconds);
        state.fps
    }

    /// Most recent rate, `None` until two ticks were seen
    pub fn fps(&self) -> Option<f32> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fps
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new(10)
    }
}
