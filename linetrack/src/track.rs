//! Persistent track state and the crossing state machine

use crate::affinity::{TrackData, WeightedAffinity};
use crate::bbox::Rect;
use crate::detection::Detection;
use crate::error::{Result, TrackError};
use crate::event::Event;
use crate::geom::Point;
use crate::world::WorldConfig;
use std::collections::VecDeque;
use std::fmt;

/// Number of anchor points remembered per track
pub const PATH_CAPACITY: usize = 50;

/// One physical person followed across frames
pub struct Track {
    pub(crate) id: u64,
    pub(crate) bbox: Rect,
    pub(crate) confidence: f32,
    pub(crate) data: Vec<TrackData>,
    pub(crate) been_inside: bool,
    pub(crate) been_outside: bool,
    pub(crate) counted_in: bool,
    pub(crate) counted_out: bool,
    pub(crate) path: VecDeque<Point>,
    pub(crate) was_detected: bool,
}

impl Track {
    /// Start a track from an unmatched detection and its modality payloads
    pub(crate) fn new(
        id: u64,
        detection: &Detection,
        data: Vec<TrackData>,
        modality_count: usize,
    ) -> Result<Self> {
        if data.len() != modality_count {
            return Err(TrackError::invariant(format!(
                "track {} created with {} payloads for {} modalities",
                id,
                data.len(),
                modality_count
            )));
        }
        Ok(Self {
            id,
            bbox: detection.bbox,
            confidence: detection.confidence,
            data,
            been_inside: false,
            been_outside: false,
            counted_in: false,
            counted_out: false,
            path: VecDeque::with_capacity(PATH_CAPACITY + 1),
            was_detected: true,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Whether a detection was merged into or spawned this track in the
    /// most recent frame
    pub fn was_detected(&self) -> bool {
        self.was_detected
    }

    pub fn counted_in(&self) -> bool {
        self.counted_in
    }

    pub fn counted_out(&self) -> bool {
        self.counted_out
    }

    /// Recent anchor points, oldest first
    pub fn path(&self) -> impl Iterator<Item = &Point> {
        self.path.iter()
    }

    pub fn modality_count(&self) -> usize {
        self.data.len()
    }

    /// Fold a matched detection into this track
    pub(crate) fn merge(
        &mut self,
        detection: &Detection,
        data: Vec<TrackData>,
        modalities: &[WeightedAffinity],
    ) -> Result<()> {
        if data.len() != modalities.len() || self.data.len() != modalities.len() {
            return Err(TrackError::invariant(format!(
                "merge into track {} with {} payloads, track holds {}, {} modalities",
                self.id,
                data.len(),
                self.data.len(),
                modalities.len()
            )));
        }

        // Every payload is checked before anything changes, so an error
        // leaves the track as it was
        for ((modality, det), trk) in modalities.iter().zip(&data).zip(&self.data) {
            modality.affinity.check_dyn(det, trk)?;
        }
        for ((modality, det), trk) in modalities.iter().zip(data).zip(self.data.iter_mut()) {
            modality.affinity.merge_dyn(det, trk)?;
        }
        self.bbox = detection.bbox;
        self.confidence = detection.confidence.max(self.confidence);
        self.was_detected = true;
        Ok(())
    }

    /// Run the crossing state machine on the current anchor point and
    /// record it in the path. Emitted events are appended to `events`.
    pub(crate) fn update(&mut self, world: &WorldConfig, events: &mut Vec<Event>) {
        let p = self.bbox.anchor();

        if world.in_bounds(p) {
            if world.inside(p) {
                self.been_inside = true;
                if self.been_outside && !self.counted_in && !self.counted_out {
                    events.push(Event::CountIn);
                    self.counted_in = true;
                } else if self.been_outside && self.counted_out {
                    events.push(Event::BackIn);
                    self.counted_out = false;
                    self.been_outside = false;
                }
            }

            if world.outside(p) {
                self.been_outside = true;
                if self.been_inside && !self.counted_out && !self.counted_in {
                    events.push(Event::CountOut);
                    self.counted_out = true;
                } else if self.been_inside && self.counted_in {
                    events.push(Event::BackOut);
                    self.counted_in = false;
                    self.been_inside = false;
                }
            }
        }

        self.path.push_back(p);
        while self.path.len() > PATH_CAPACITY {
            self.path.pop_front();
        }
    }

    pub(crate) fn decay(&mut self, amount: f32) {
        self.confidence -= amount;
    }
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("bbox", &self.bbox)
            .field("confidence", &self.confidence)
            .field("modalities", &self.data.len())
            .field("been_inside", &self.been_inside)
            .field("been_outside", &self.been_outside)
            .field("counted_in", &self.counted_in)
            .field("counted_out", &self.counted_out)
            .field("path_len", &self.path.len())
            .field("was_detected", &self.was_detected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Line;

    /// Crossing from x = -0.05 to x = 0.05 at mid height, so inside is
    /// x < -0.05 and outside is x >= 0.05
    fn world() -> WorldConfig {
        WorldConfig::new(Line::from_coords(-0.05, 0.5, 0.05, 0.5), vec![])
    }

    /// Box whose anchor sits at `(x, 0.5)`
    fn at(x: f32) -> Rect {
        Rect::new(x - 0.05, 0.45, 0.1, 0.2)
    }

    fn track_at(x: f32) -> Track {
        Track::new(1, &Detection::new(at(x), 1.0), vec![], 0).unwrap()
    }

    fn walk(track: &mut Track, xs: &[f32]) -> Vec<Event> {
        let world = world();
        let mut events = Vec::new();
        for &x in xs {
            track.bbox = at(x);
            track.update(&world, &mut events);
        }
        events
    }

    #[test]
    fn test_single_crossing_fires_once() {
        let mut track = track_at(-0.1);
        let events = walk(&mut track, &[-0.1, -0.08, -0.02, 0.0, 0.06, 0.08, 0.1, 0.1]);
        assert_eq!(events, vec![Event::CountOut]);
        assert!(track.counted_out());
    }

    #[test]
    fn test_return_emits_compensating_event() {
        let mut track = track_at(-0.1);
        let events = walk(&mut track, &[-0.1, 0.0, 0.1, 0.1, 0.0, -0.1, -0.1, -0.1]);
        assert_eq!(events, vec![Event::CountOut, Event::BackIn]);
        assert!(!track.counted_out());
        assert!(!track.counted_in());
    }

    #[test]
    fn test_inward_crossing() {
        let mut track = track_at(0.1);
        let events = walk(&mut track, &[0.1, 0.0, -0.1, 0.1, -0.1]);
        assert_eq!(events, vec![Event::CountIn, Event::BackOut, Event::CountIn]);
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let bounded = WorldConfig::new(
            world().crossing,
            // only y < 0.3 is in bounds
            vec![Line::from_coords(1.0, 0.3, 0.0, 0.3)],
        );
        let mut track = track_at(-0.1);
        let mut events = Vec::new();
        for x in [-0.1, 0.1] {
            track.bbox = at(x);
            track.update(&bounded, &mut events);
        }
        assert!(events.is_empty());
        assert_eq!(track.path().count(), 2);
    }

    #[test]
    fn test_path_is_bounded() {
        let mut track = track_at(0.0);
        let xs: Vec<f32> = (0..PATH_CAPACITY + 10).map(|i| i as f32 * 0.001).collect();
        walk(&mut track, &xs);
        assert_eq!(track.path().count(), PATH_CAPACITY);
        let first = track.path().next().unwrap();
        assert!((first.x - 0.010).abs() < 1e-6);
    }

    #[test]
    fn test_payload_count_checked_on_creation() {
        let det = Detection::new(at(0.0), 0.9);
        let err = Track::new(3, &det, vec![], 2).unwrap_err();
        assert!(matches!(err, TrackError::InvariantViolation(_)));
    }

    #[test]
    fn test_failed_merge_leaves_track_untouched() {
        use crate::affinities::{PositionAffinity, PositionData};
        use image::RgbImage;

        let modalities = vec![
            WeightedAffinity::new(1.0, PositionAffinity::default()),
            WeightedAffinity::new(1.0, PositionAffinity::default()),
        ];
        let frame = RgbImage::new(4, 4);
        let start = Detection::new(at(-0.1), 0.5);
        let payloads = |det: &Detection| -> Vec<TrackData> {
            modalities
                .iter()
                .map(|m| m.affinity.init_dyn(det, &frame, 0).unwrap())
                .collect()
        };
        let mut track = Track::new(1, &start, payloads(&start), 2).unwrap();
        track.was_detected = false;

        // First payload is valid, second was built by some other modality
        let next = Detection::new(at(0.1), 0.9);
        let mut data = payloads(&next);
        data[1] = Box::new(7_u32);
        let err = track.merge(&next, data, &modalities).unwrap_err();
        assert!(matches!(err, TrackError::InvariantViolation(_)));

        assert_eq!(track.bbox(), start.bbox);
        assert_eq!(track.confidence(), 0.5);
        assert!(!track.was_detected());
        let first = track.data[0].downcast_ref::<PositionData>().unwrap();
        assert_eq!(first.loc, start.bbox);
        assert!(modalities[0].affinity.check_dyn(&track.data[0], &track.data[1]).is_ok());
    }
}
