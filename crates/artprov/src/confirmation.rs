//! Operator confirmation of a detection's artwork.

use chrono::Utc;
use serde::Serialize;

use crate::db::{artwork_repo, detection_repo, provenance_repo, Database};
use crate::error::{Entity, ServiceError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmationResponse {
    pub detection_id: i64,
    pub original_artwork_id: i64,
    pub confirmed_artwork_id: i64,
    pub provenance_record_id: i64,
    pub reassigned: bool,
    pub message: String,
}

/// Records `artwork_id` as the confirmed identity of a detection.
///
/// Keeps exactly one provenance record per detection: an existing record is
/// repointed, otherwise one is created for the exhibition of the
/// detection's photo. The record write and the detection reassignment
/// commit together or not at all.
pub fn confirm_match(
    db: &Database,
    detection_id: i64,
    artwork_id: i64,
) -> Result<ConfirmationResponse, ServiceError> {
    db.with_transaction(|tx| {
        let detection = detection_repo::find_by_id(tx, detection_id)?
            .ok_or_else(|| ServiceError::not_found(Entity::Detection, detection_id))?;
        if artwork_repo::find_by_id(tx, artwork_id)?.is_none() {
            return Err(ServiceError::not_found(Entity::Artwork, artwork_id));
        }

        let provenance_record_id = match provenance_repo::find_by_detection(tx, detection_id)? {
            Some(existing) => {
                if existing.artwork_id != artwork_id {
                    provenance_repo::update_artwork(tx, existing.id, artwork_id)?;
                }
                existing.id
            }
            None => provenance_repo::insert(
                tx,
                artwork_id,
                detection.exhibition_id,
                detection_id,
                Utc::now(),
            )?,
        };

        let reassigned = detection.artwork_id != artwork_id;
        if reassigned {
            detection_repo::reassign_artwork(tx, detection_id, artwork_id)?;
        }

        log::info!(
            "Confirmed detection {} as artwork {} (was {})",
            detection_id,
            artwork_id,
            detection.artwork_id
        );

        Ok(ConfirmationResponse {
            detection_id,
            original_artwork_id: detection.artwork_id,
            confirmed_artwork_id: artwork_id,
            provenance_record_id,
            reassigned,
            message: "Match confirmed and provenance record created".to_string(),
        })
    })
}
