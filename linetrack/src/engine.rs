//! Greedy multi-modal association of detections to tracks
//!
//! Every frame the engine:
//! 1. builds one payload per modality for every detection
//! 2. scores every (detection, track) pair with the product of the weighted,
//!    zero-clamped modality scores
//! 3. merges pairs greedily from the best score down until the merge
//!    threshold, each detection and each track taking part at most once
//! 4. spawns a track for every detection left over
//! 5. runs the crossing state machine on every track, decays confidence by
//!    the number of frames elapsed and drops tracks at or below the dead
//!    threshold
//!
//! `process` takes `&mut self`, so exactly one frame is processed at a time.
//! Frame indices are expected to increase between calls.

use crate::affinity::{combined_score, Affinity, TrackData, WeightedAffinity};
use crate::detection::Detection;
use crate::error::{Result, TrackError};
use crate::event::Event;
use crate::track::Track;
use crate::world::WorldConfig;
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Callback invoked for every track matched or spawned in a frame
pub type TrackListener = Box<dyn FnMut(&RgbImage, u64, &Track) + Send>;

/// Association tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum combined score for a detection to merge into a track
    pub merge_threshold: f32,
    /// Confidence lost per elapsed frame
    pub decay_rate: f32,
    /// Tracks at or below this confidence are removed
    pub dead_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 0.6,
            decay_rate: 0.03,
            dead_threshold: 0.2,
        }
    }
}

/// Common interface for frame-by-frame crossing trackers
pub trait Tracker: Send {
    /// Consume one frame of detections and return the crossing events it
    /// produced, in track order
    fn process(
        &mut self,
        world: &WorldConfig,
        detections: &[Detection],
        frame: &RgbImage,
        frame_no: u64,
    ) -> Result<Vec<Event>>;

    /// Live tracks after the most recent frame
    fn tracks(&self) -> &[Track];
}

/// Candidate (detection, track) pair
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    detection: usize,
    track: usize,
    track_id: u64,
}

/// Per-frame outcome, kept for logging
#[derive(Debug, Default, Clone, Copy)]
struct FrameSummary {
    merged: usize,
    spawned: usize,
    removed: usize,
}

/// Owns the live track set
pub struct AssociationEngine {
    config: EngineConfig,
    modalities: Vec<WeightedAffinity>,
    tracks: Vec<Track>,
    next_id: u64,
    prev_frame_no: Option<u64>,
    listener: Option<TrackListener>,
    frames_processed: u64,
    tracks_created: u64,
}

impl AssociationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            modalities: Vec::new(),
            tracks: Vec::new(),
            next_id: 0,
            prev_frame_no: None,
            listener: None,
            frames_processed: 0,
            tracks_created: 0,
        }
    }

    /// Append a modality. The modality list is fixed once tracks exist.
    pub fn with_affinity<A: Affinity + 'static>(mut self, weight: f32, affinity: A) -> Self {
        self.modalities.push(WeightedAffinity::new(weight, affinity));
        self
    }

    /// Register a callback invoked for every track detected in a frame
    pub fn set_track_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&RgbImage, u64, &Track) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn modality_count(&self) -> usize {
        self.modalities.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: u64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Drop every track and forget the previous frame index.
    /// Track ids keep increasing.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.prev_frame_no = None;
    }

    /// Process one frame of detections
    pub fn process(
        &mut self,
        world: &WorldConfig,
        detections: &[Detection],
        frame: &RgbImage,
        frame_no: u64,
    ) -> Result<Vec<Event>> {
        for track in &mut self.tracks {
            track.was_detected = false;
        }

        let mut summary = FrameSummary::default();
        let mut pending = self.init_detections(detections, frame, frame_no)?;
        let candidates = self.score_candidates(&pending)?;

        let mut detection_used = vec![false; detections.len()];
        let mut track_used = vec![false; self.tracks.len()];
        for candidate in candidates {
            if detection_used[candidate.detection] || track_used[candidate.track] {
                continue;
            }
            let data = pending[candidate.detection].take().ok_or_else(|| {
                TrackError::invariant(format!(
                    "detection {} merged twice",
                    candidate.detection
                ))
            })?;
            self.tracks[candidate.track].merge(
                &detections[candidate.detection],
                data,
                &self.modalities,
            )?;
            detection_used[candidate.detection] = true;
            track_used[candidate.track] = true;
            summary.merged += 1;

            log::debug!(
                "Frame {}: detection {} -> track {} (score {:.3})",
                frame_no,
                candidate.detection,
                candidate.track_id,
                candidate.score
            );
        }

        for (index, data) in pending.into_iter().enumerate() {
            if let Some(data) = data {
                let id = self.next_id;
                let track = Track::new(id, &detections[index], data, self.modalities.len())?;
                self.next_id += 1;
                self.tracks_created += 1;
                summary.spawned += 1;
                log::debug!("Frame {}: new track {} at {}", frame_no, id, track.bbox);
                self.tracks.push(track);
            }
        }

        if let Some(listener) = self.listener.as_mut() {
            for track in self.tracks.iter().filter(|t| t.was_detected) {
                listener(frame, frame_no, track);
            }
        }

        let delta = self.frame_delta(frame_no);
        let decay = self.config.decay_rate * delta as f32;
        let dead_threshold = self.config.dead_threshold;
        let mut events = Vec::new();
        let before = self.tracks.len();
        self.tracks.retain_mut(|track| {
            let start = events.len();
            track.update(world, &mut events);
            for event in &events[start..] {
                log::debug!("Frame {}: track {} {}", frame_no, track.id, event);
            }
            track.decay(decay);
            track.confidence > dead_threshold
        });
        summary.removed = before - self.tracks.len();

        self.prev_frame_no = Some(frame_no);
        self.frames_processed += 1;
        if self.frames_processed % 100 == 0 {
            log::info!(
                "Association: {} frames, {} live tracks, {} tracks created",
                self.frames_processed,
                self.tracks.len(),
                self.tracks_created
            );
        }
        log::debug!(
            "Frame {}: {} detections, {} merged, {} spawned, {} removed, {} events",
            frame_no,
            detections.len(),
            summary.merged,
            summary.spawned,
            summary.removed,
            events.len()
        );

        Ok(events)
    }

    /// Build every modality payload for every detection
    fn init_detections(
        &self,
        detections: &[Detection],
        frame: &RgbImage,
        frame_no: u64,
    ) -> Result<Vec<Option<Vec<TrackData>>>> {
        let modalities = &self.modalities;
        detections
            .par_iter()
            .map(|detection| {
                modalities
                    .iter()
                    .map(|m| m.affinity.init_dyn(detection, frame, frame_no))
                    .collect::<Result<Vec<TrackData>>>()
                    .map(Some)
            })
            .collect()
    }

    /// Score every pair and keep those at or above the merge threshold,
    /// best first. Ties go to the lower detection index, then the lower
    /// track id.
    fn score_candidates(&self, pending: &[Option<Vec<TrackData>>]) -> Result<Vec<Candidate>> {
        let threshold = self.config.merge_threshold;
        let modalities = &self.modalities;
        let tracks = &self.tracks;

        let scored = pending
            .par_iter()
            .enumerate()
            .map(|(detection, data)| {
                let data = data.as_deref().unwrap_or_default();
                tracks
                    .iter()
                    .enumerate()
                    .map(|(track, t)| {
                        combined_score(modalities, data, &t.data).map(|score| Candidate {
                            score,
                            detection,
                            track,
                            track_id: t.id,
                        })
                    })
                    .collect::<Result<Vec<Candidate>>>()
            })
            .collect::<Result<Vec<Vec<Candidate>>>>()?;

        let mut candidates: Vec<Candidate> = scored
            .into_iter()
            .flatten()
            .filter(|c| c.score >= threshold)
            .collect();
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.detection.cmp(&b.detection))
                .then(a.track_id.cmp(&b.track_id))
        });
        Ok(candidates)
    }

    /// Frames elapsed since the previous call, never less than one
    fn frame_delta(&self, frame_no: u64) -> u64 {
        match self.prev_frame_no {
            Some(prev) if frame_no > prev => frame_no - prev,
            Some(prev) => {
                log::warn!(
                    "Frame index did not increase ({} after {}), decaying one frame",
                    frame_no,
                    prev
                );
                1
            }
            None => 1,
        }
    }
}

impl Default for AssociationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Tracker for AssociationEngine {
    fn process(
        &mut self,
        world: &WorldConfig,
        detections: &[Detection],
        frame: &RgbImage,
        frame_no: u64,
    ) -> Result<Vec<Event>> {
        AssociationEngine::process(self, world, detections, frame, frame_no)
    }

    fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

impl std::fmt::Debug for AssociationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.modalities.iter().map(|m| m.affinity.name()).collect();
        f.debug_struct("AssociationEngine")
            .field("config", &self.config)
            .field("modalities", &names)
            .field("tracks", &self.tracks.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
