//! Synthetic detector used in place of a vision model.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::db::artwork_repo::ArtworkRow;
use crate::db::detection_repo::BoundingBox;

pub const X_RANGE: (u32, u32) = (50, 400);
pub const Y_RANGE: (u32, u32) = (50, 300);
pub const WIDTH_RANGE: (u32, u32) = (100, 300);
pub const HEIGHT_RANGE: (u32, u32) = (100, 400);
pub const CONFIDENCE_RANGE: (f64, f64) = (0.75, 0.98);

/// One hypothesized sighting, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDetection {
    pub artwork_id: i64,
    pub confidence_score: f64,
    pub bounding_box: BoundingBox,
}

/// Picks artworks and draws boxes and scores from an injectable RNG.
pub struct DetectionSampler<R: Rng = StdRng> {
    rng: R,
    max_detections: usize,
}

impl DetectionSampler<StdRng> {
    /// Seeded when `seed` is given, otherwise seeded from OS entropy.
    pub fn from_seed(seed: Option<u64>, max_detections: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rng, max_detections)
    }
}

impl<R: Rng> DetectionSampler<R> {
    pub fn with_rng(rng: R, max_detections: usize) -> Self {
        Self {
            rng,
            max_detections: max_detections.max(1),
        }
    }

    /// Chooses between 1 and `min(max_detections, candidates.len())`
    /// distinct candidates. Returns nothing for an empty slice.
    pub fn sample(&mut self, candidates: &[ArtworkRow]) -> Vec<SyntheticDetection> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let upper = self.max_detections.min(candidates.len());
        let count = self.rng.gen_range(1..=upper);

        let chosen: Vec<i64> = candidates
            .choose_multiple(&mut self.rng, count)
            .map(|a| a.id)
            .collect();

        chosen
            .into_iter()
            .map(|artwork_id| SyntheticDetection {
                artwork_id,
                confidence_score: self
                    .rng
                    .gen_range(CONFIDENCE_RANGE.0..=CONFIDENCE_RANGE.1),
                bounding_box: BoundingBox {
                    x: self.rng.gen_range(X_RANGE.0..=X_RANGE.1),
                    y: self.rng.gen_range(Y_RANGE.0..=Y_RANGE.1),
                    width: self.rng.gen_range(WIDTH_RANGE.0..=WIDTH_RANGE.1),
                    height: self.rng.gen_range(HEIGHT_RANGE.0..=HEIGHT_RANGE.1),
                },
            })
            .collect()
    }
}
