//! Crossing events and running counts

use serde::{Deserialize, Serialize};
use std::fmt;

/// A directional crossing event emitted by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// Someone went in
    CountIn,
    /// Someone went out
    CountOut,
    /// Someone counted as out came straight back in
    BackIn,
    /// Someone counted as in went straight back out
    BackOut,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::CountIn => "COUNT_IN",
            Event::CountOut => "COUNT_OUT",
            Event::BackIn => "BACK_IN",
            Event::BackOut => "BACK_OUT",
        }
    }

    /// Change this event makes to `in - out`
    pub fn delta(&self) -> i32 {
        match self {
            Event::CountIn | Event::BackIn => 1,
            Event::CountOut | Event::BackOut => -1,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Running totals aggregated from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counts {
    pub inside: i64,
    pub outside: i64,
}

impl Counts {
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::CountIn => self.inside += 1,
            Event::CountOut => self.outside += 1,
            Event::BackIn => self.outside -= 1,
            Event::BackOut => self.inside -= 1,
        }
    }

    /// People currently on the inside, relative to the start of counting
    pub fn net(&self) -> i64 {
        self.inside - self.outside
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IN {} OUT {}", self.inside, self.outside)
    }
}
