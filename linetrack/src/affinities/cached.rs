//! Appearance features backed by a cache keyed on frame and box

use crate::affinities::feature::{FeatureAffinity, FeatureData, FeatureExtractor};
use crate::affinity::Affinity;
use crate::detection::Detection;
use crate::error::Result;
use image::RgbImage;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Storage for previously computed embeddings.
///
/// Replaying a recorded video produces the same detections on every run,
/// so the embeddings can be reused across runs.
pub trait FeatureCache: Send + Sync {
    fn fetch(&self, frame_no: u64, detection: &Detection) -> Option<FeatureData>;

    fn store(&self, frame_no: u64, detection: &Detection, data: &FeatureData);

    fn clear(&self);
}

type CacheKey = (u64, [u32; 5]);

fn cache_key(frame_no: u64, detection: &Detection) -> CacheKey {
    let b = &detection.bbox;
    (
        frame_no,
        [
            b.x.to_bits(),
            b.y.to_bits(),
            b.width.to_bits(),
            b.height.to_bits(),
            detection.confidence.to_bits(),
        ],
    )
}

/// In-process [`FeatureCache`]
#[derive(Default)]
pub struct MemoryFeatureCache {
    entries: Mutex<HashMap<CacheKey, Vec<f32>>>,
}

impl MemoryFeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, Vec<f32>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeatureCache for MemoryFeatureCache {
    fn fetch(&self, frame_no: u64, detection: &Detection) -> Option<FeatureData> {
        self.entries()
            .get(&cache_key(frame_no, detection))
            .map(|features| FeatureData {
                features: features.clone(),
            })
    }

    fn store(&self, frame_no: u64, detection: &Detection, data: &FeatureData) {
        self.entries()
            .insert(cache_key(frame_no, detection), data.features.clone());
    }

    fn clear(&self) {
        self.entries().clear();
    }
}

/// [`FeatureAffinity`] that consults a cache before running the extractor
pub struct CachedFeatures<E, C> {
    features: FeatureAffinity<E>,
    cache: C,
}

impl<E: FeatureExtractor, C: FeatureCache> CachedFeatures<E, C> {
    pub fn new(features: FeatureAffinity<E>, cache: C) -> Self {
        Self { features, cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<E: FeatureExtractor, C: FeatureCache> Affinity for CachedFeatures<E, C> {
    type Data = FeatureData;

    fn name(&self) -> &str {
        "cached-feature"
    }

    fn init(&self, detection: &Detection, frame: &RgbImage, frame_no: u64) -> Result<FeatureData> {
        if let Some(hit) = self.cache.fetch(frame_no, detection) {
            return Ok(hit);
        }
        let data = self.features.init(detection, frame, frame_no)?;
        self.cache.store(frame_no, detection, &data);
        Ok(data)
    }

    fn score(&self, detection: &FeatureData, track: &FeatureData) -> f32 {
        self.features.score(detection, track)
    }

    fn merge(&self, detection: FeatureData, track: &mut FeatureData) {
        self.features.merge(detection, track)
    }
}
