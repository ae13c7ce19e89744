//! Pluggable similarity modalities
//!
//! A modality builds an opaque payload for every detection, scores detection
//! payloads against track payloads and folds a matched detection into the
//! track payload. The engine keeps an ordered list of modalities and every
//! track carries exactly one payload per modality, in the same order.
//!
//! Modalities are written against the typed [`Affinity`] trait. The engine
//! stores them as [`DynAffinity`] trait objects, which every `Affinity`
//! implements through a blanket impl, with payloads boxed as [`TrackData`].

use crate::detection::Detection;
use crate::error::{Result, TrackError};
use image::RgbImage;
use std::any::Any;

/// Type erased payload owned by a track for one modality
pub type TrackData = Box<dyn Any + Send + Sync>;

/// Typed similarity contract
pub trait Affinity: Send + Sync {
    /// Per-track state owned by this modality
    type Data: Send + Sync + 'static;

    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Build the payload for a detection in the current frame.
    ///
    /// Called once per detection per frame and must not depend on any
    /// track state.
    fn init(&self, detection: &Detection, frame: &RgbImage, frame_no: u64) -> Result<Self::Data>;

    /// Similarity between a detection payload and a track payload, higher is
    /// more similar. Called for every candidate pair, so keep it cheap.
    fn score(&self, detection: &Self::Data, track: &Self::Data) -> f32;

    /// Absorb the payload of a matched detection into the track payload
    fn merge(&self, detection: Self::Data, track: &mut Self::Data);
}

/// Object safe view of an [`Affinity`] over boxed payloads
pub trait DynAffinity: Send + Sync {
    fn name(&self) -> &str;

    fn init_dyn(&self, detection: &Detection, frame: &RgbImage, frame_no: u64)
        -> Result<TrackData>;

    fn score_dyn(&self, detection: &TrackData, track: &TrackData) -> Result<f32>;

    /// Fail unless both payloads were built by this modality
    fn check_dyn(&self, detection: &TrackData, track: &TrackData) -> Result<()>;

    fn merge_dyn(&self, detection: TrackData, track: &mut TrackData) -> Result<()>;
}

fn payload_mismatch(name: &str) -> TrackError {
    TrackError::invariant(format!(
        "payload handed to modality '{}' was built by a different modality",
        name
    ))
}

impl<A: Affinity> DynAffinity for A {
    fn name(&self) -> &str {
        Affinity::name(self)
    }

    fn init_dyn(
        &self,
        detection: &Detection,
        frame: &RgbImage,
        frame_no: u64,
    ) -> Result<TrackData> {
        let data = self.init(detection, frame, frame_no)?;
        Ok(Box::new(data))
    }

    fn score_dyn(&self, detection: &TrackData, track: &TrackData) -> Result<f32> {
        let det = (**detection)
            .downcast_ref::<A::Data>()
            .ok_or_else(|| payload_mismatch(Affinity::name(self)))?;
        let trk = (**track)
            .downcast_ref::<A::Data>()
            .ok_or_else(|| payload_mismatch(Affinity::name(self)))?;
        Ok(self.score(det, trk))
    }

    fn check_dyn(&self, detection: &TrackData, track: &TrackData) -> Result<()> {
        if (**detection).is::<A::Data>() && (**track).is::<A::Data>() {
            Ok(())
        } else {
            Err(payload_mismatch(Affinity::name(self)))
        }
    }

    fn merge_dyn(&self, detection: TrackData, track: &mut TrackData) -> Result<()> {
        let det = detection
            .downcast::<A::Data>()
            .map_err(|_| payload_mismatch(Affinity::name(self)))?;
        let trk = (**track)
            .downcast_mut::<A::Data>()
            .ok_or_else(|| payload_mismatch(Affinity::name(self)))?;
        self.merge(*det, trk);
        Ok(())
    }
}

/// A modality together with its weight in the combined score
pub struct WeightedAffinity {
    pub weight: f32,
    pub affinity: Box<dyn DynAffinity>,
}

impl WeightedAffinity {
    pub fn new<A: Affinity + 'static>(weight: f32, affinity: A) -> Self {
        Self {
            weight,
            affinity: Box::new(affinity),
        }
    }

    /// This modality's factor in the combined score.
    ///
    /// Negative scores clamp to zero, so any single modality can veto a pair.
    pub fn factor(&self, detection: &TrackData, track: &TrackData) -> Result<f32> {
        let score = self.affinity.score_dyn(detection, track)?;
        Ok(self.weight * score.max(0.0))
    }
}

/// Product of the weighted, clamped scores of every modality
pub fn combined_score(
    modalities: &[WeightedAffinity],
    detection: &[TrackData],
    track: &[TrackData],
) -> Result<f32> {
    if detection.len() != modalities.len() || track.len() != modalities.len() {
        return Err(TrackError::invariant(format!(
            "{} modalities configured but detection has {} payloads and track has {}",
            modalities.len(),
            detection.len(),
            track.len()
        )));
    }

    let mut combined = 1.0;
    for ((modality, det), trk) in modalities.iter().zip(detection).zip(track) {
        combined *= modality.factor(det, trk)?;
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::Rect;
    use approx::assert_abs_diff_eq;

    /// Scores 1 - |dx| on the box x coordinate
    struct XAffinity;

    impl Affinity for XAffinity {
        type Data = f32;

        fn name(&self) -> &str {
            "x"
        }

        fn init(&self, detection: &Detection, _: &RgbImage, _: u64) -> Result<f32> {
            Ok(detection.bbox.x)
        }

        fn score(&self, detection: &f32, track: &f32) -> f32 {
            1.0 - (detection - track).abs()
        }

        fn merge(&self, detection: f32, track: &mut f32) {
            *track = detection;
        }
    }

    /// Payload of a different type than XAffinity
    struct Label;

    impl Affinity for Label {
        type Data = String;

        fn name(&self) -> &str {
            "label"
        }

        fn init(&self, _: &Detection, _: &RgbImage, frame_no: u64) -> Result<String> {
            Ok(frame_no.to_string())
        }

        fn score(&self, _: &String, _: &String) -> f32 {
            1.0
        }

        fn merge(&self, detection: String, track: &mut String) {
            *track = detection;
        }
    }

    fn frame() -> RgbImage {
        RgbImage::new(8, 8)
    }

    fn det(x: f32) -> Detection {
        Detection::new(Rect::new(x, 0.0, 0.1, 0.1), 0.9)
    }

    #[test]
    fn test_erased_round_trip() {
        let modality = WeightedAffinity::new(1.0, XAffinity);
        let a = modality.affinity.init_dyn(&det(0.2), &frame(), 0).unwrap();
        let mut b = modality.affinity.init_dyn(&det(0.5), &frame(), 0).unwrap();

        assert_abs_diff_eq!(modality.factor(&a, &b).unwrap(), 0.7, epsilon = 1e-6);

        modality.affinity.merge_dyn(a, &mut b).unwrap();
        assert_abs_diff_eq!(*b.downcast_ref::<f32>().unwrap(), 0.2);
    }

    #[test]
    fn test_negative_score_vetoes() {
        let modalities = vec![
            WeightedAffinity::new(1.0, XAffinity),
            WeightedAffinity::new(5.0, Label),
        ];
        let f = frame();
        let near: Vec<TrackData> = modalities
            .iter()
            .map(|m| m.affinity.init_dyn(&det(0.0), &f, 0).unwrap())
            .collect();
        // 1 - |0 - 2| = -1 is clamped to 0 whatever the other modality says
        let far: Vec<TrackData> = modalities
            .iter()
            .map(|m| m.affinity.init_dyn(&det(2.0), &f, 0).unwrap())
            .collect();

        assert_abs_diff_eq!(combined_score(&modalities, &near, &near).unwrap(), 5.0);
        assert_eq!(combined_score(&modalities, &near, &far).unwrap(), 0.0);
    }

    #[test]
    fn test_payload_mismatch_is_invariant_violation() {
        let x = WeightedAffinity::new(1.0, XAffinity);
        let label = WeightedAffinity::new(1.0, Label);
        let f = frame();
        let a = x.affinity.init_dyn(&det(0.0), &f, 0).unwrap();
        let b = label.affinity.init_dyn(&det(0.0), &f, 3).unwrap();

        let err = x.factor(&a, &b).unwrap_err();
        assert!(matches!(err, TrackError::InvariantViolation(_)));
    }

    #[test]
    fn test_payload_count_mismatch() {
        let modalities = vec![WeightedAffinity::new(1.0, XAffinity)];
        let err = combined_score(&modalities, &[], &[]).unwrap_err();
        assert!(matches!(err, TrackError::InvariantViolation(_)));
    }
}
