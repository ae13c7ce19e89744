//! Appearance embeddings compared by cosine similarity

use crate::affinity::Affinity;
use crate::detection::Detection;
use crate::error::{Result, TrackError};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Patch used when a detection box does not cover a single pixel
const FALLBACK_PATCH: (u32, u32, u32, u32) = (1, 1, 3, 3);

/// Produces an appearance embedding for an image patch.
///
/// This is the seam for re-identification models. Errors are reported as
/// plain strings and surface as [`TrackError::Modality`].
pub trait FeatureExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, patch: &RgbImage) -> std::result::Result<Vec<f32>, String>;
}

/// Appearance embedding of one detection or track
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureData {
    pub features: Vec<f32>,
}

/// Cosine similarity with a small epsilon so zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt() + 0.0001)
}

/// Crop the detection out of the frame, clipped to the frame
pub fn crop_detection(detection: &Detection, frame: &RgbImage) -> RgbImage {
    let (x, y, w, h) = match detection.bbox.to_pixels(frame.width(), frame.height()) {
        Some(px) => (px.x, px.y, px.width, px.height),
        None => FALLBACK_PATCH,
    };
    imageops::crop_imm(frame, x, y, w, h).to_image()
}

/// Compares appearance embeddings of the detection patch
pub struct FeatureAffinity<E> {
    extractor: E,
}

impl<E: FeatureExtractor> FeatureAffinity<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }
}

impl<E: FeatureExtractor> Affinity for FeatureAffinity<E> {
    type Data = FeatureData;

    fn name(&self) -> &str {
        "feature"
    }

    fn init(&self, detection: &Detection, frame: &RgbImage, _frame_no: u64) -> Result<FeatureData> {
        let patch = crop_detection(detection, frame);
        let features = self
            .extractor
            .extract(&patch)
            .map_err(|e| TrackError::modality(self.extractor.name(), e))?;
        Ok(FeatureData { features })
    }

    fn score(&self, detection: &FeatureData, track: &FeatureData) -> f32 {
        cosine_similarity(&detection.features, &track.features)
    }

    fn merge(&self, detection: FeatureData, track: &mut FeatureData) {
        track.features = detection.features;
    }
}

/// Per-channel colour histogram of the patch resized to 48x96.
///
/// A cheap stand-in for a re-identification network.
#[derive(Debug, Clone)]
pub struct ColorHistogramExtractor {
    bins: usize,
}

impl ColorHistogramExtractor {
    pub const PATCH_WIDTH: u32 = 48;
    pub const PATCH_HEIGHT: u32 = 96;

    pub fn new(bins: usize) -> Self {
        Self { bins: bins.clamp(1, 256) }
    }

    pub fn feature_len(&self) -> usize {
        self.bins * 3
    }
}

impl Default for ColorHistogramExtractor {
    fn default() -> Self {
        Self::new(16)
    }
}

impl FeatureExtractor for ColorHistogramExtractor {
    fn name(&self) -> &str {
        "color-histogram"
    }

    fn extract(&self, patch: &RgbImage) -> std::result::Result<Vec<f32>, String> {
        let mut histogram = vec![0.0f32; self.feature_len()];
        if patch.width() == 0 || patch.height() == 0 {
            return Ok(histogram);
        }

        let resized = imageops::resize(
            patch,
            Self::PATCH_WIDTH,
            Self::PATCH_HEIGHT,
            FilterType::Triangle,
        );
        for pixel in resized.pixels() {
            for (channel, value) in pixel.0.iter().enumerate() {
                let bin = *value as usize * self.bins / 256;
                histogram[channel * self.bins + bin] += 1.0;
            }
        }

        let total = (Self::PATCH_WIDTH * Self::PATCH_HEIGHT) as f32;
        histogram.iter_mut().for_each(|v| *v /= total);
        Ok(histogram)
    }
}
