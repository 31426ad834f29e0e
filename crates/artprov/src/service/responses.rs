use serde::Serialize;

use crate::broadcast::JobStatus;
use crate::db::detection_repo::DetectionWithArtwork;
use crate::db::photo_repo::ProcessedStatus;
use crate::matching::{MatchCandidate, MatchSource};

/// Returned as soon as a photo is accepted; processing continues in the
/// background.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitPhotoResponse {
    pub job_id: String,
    pub installation_photo_id: i64,
    pub status: JobStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoDetectionsResponse {
    pub installation_photo_id: i64,
    pub photo_url: String,
    pub exhibition_name: String,
    pub processed_status: ProcessedStatus,
    pub detections: Vec<DetectionWithArtwork>,
    pub total_detections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchesResponse {
    pub detection_id: i64,
    pub detected_artwork_id: i64,
    pub detected_artwork_title: String,
    pub confidence_score: f64,
    pub similar_artworks: Vec<MatchCandidate>,
    pub total_matches: usize,
    pub source: MatchSource,
}
