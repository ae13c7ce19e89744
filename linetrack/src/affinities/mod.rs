//! Concrete affinity modalities

mod cached;
mod feature;
mod position;
mod timed;

pub use cached::{CachedFeatures, FeatureCache, MemoryFeatureCache};
pub use feature::{
    cosine_similarity, crop_detection, ColorHistogramExtractor, FeatureAffinity, FeatureData,
    FeatureExtractor,
};
pub use position::{PositionAffinity, PositionData};
pub use timed::{SimulatedClock, TimedAffinity};
