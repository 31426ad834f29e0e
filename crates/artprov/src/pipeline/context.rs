use crate::db::artwork_repo::ArtworkRow;
use crate::worker::job::PhotoJob;

use super::sampler::SyntheticDetection;

pub struct PipelineContext {
    // Input
    pub job: PhotoJob,

    // Step 1 result
    pub candidates: Vec<ArtworkRow>,

    // Step 2 result
    pub detections: Vec<SyntheticDetection>,

    // Step 3 result, one ID per synthesized detection
    pub detection_ids: Vec<i64>,
}

impl PipelineContext {
    pub fn new(job: PhotoJob) -> Self {
        Self {
            job,
            candidates: Vec::new(),
            detections: Vec::new(),
            detection_ids: Vec::new(),
        }
    }
}
