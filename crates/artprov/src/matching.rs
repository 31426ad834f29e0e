//! Candidate matches for a detection.
//!
//! The vector index is consulted first; when it yields nothing the resolver
//! falls back to metadata heuristics over the catalog.

use serde::Serialize;

use crate::config::MatchingConfig;
use crate::db::artwork_repo::{self, ArtworkRow, MetadataFilter};
use crate::db::{Database, DatabaseError};
use crate::vector::VectorIndex;

const HEURISTIC_BASE: f32 = 0.6;
const FORMAT_BONUS: f32 = 0.2;
const CLOSE_YEAR_BONUS: f32 = 0.15;
const NEAR_YEAR_BONUS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Vector,
    Metadata,
}

/// One ranked candidate with a similarity score in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub artwork_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub format_type: Option<String>,
    pub image_url: Option<String>,
    pub similarity_score: f32,
}

impl MatchCandidate {
    fn from_artwork(artwork: ArtworkRow, similarity_score: f32) -> Self {
        Self {
            artwork_id: artwork.id,
            title: artwork.title,
            year: artwork.year,
            format_type: artwork.format_type,
            image_url: artwork.image_url,
            similarity_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSet {
    pub source: MatchSource,
    pub candidates: Vec<MatchCandidate>,
}

pub struct MatchResolver {
    db: Database,
    index: VectorIndex,
    settings: MatchingConfig,
}

impl MatchResolver {
    pub fn new(db: Database, index: VectorIndex, settings: MatchingConfig) -> Self {
        Self {
            db,
            index,
            settings,
        }
    }

    /// Ranked alternatives for the artwork a detection currently points at.
    ///
    /// Failures on the vector path fall back to the metadata heuristic;
    /// only heuristic catalog errors surface.
    pub fn resolve(&self, detected: &ArtworkRow) -> Result<MatchSet, DatabaseError> {
        let vector_hits = self.vector_candidates(detected);
        if !vector_hits.is_empty() {
            return Ok(MatchSet {
                source: MatchSource::Vector,
                candidates: vector_hits,
            });
        }

        Ok(MatchSet {
            source: MatchSource::Metadata,
            candidates: self.heuristic_candidates(detected)?,
        })
    }

    fn vector_candidates(&self, detected: &ArtworkRow) -> Vec<MatchCandidate> {
        if !self.index.is_available() {
            return Vec::new();
        }
        let Some(embedding) = detected.vector_embedding.as_deref().filter(|v| !v.is_empty()) else {
            return Vec::new();
        };

        let hits = self.index.query(
            embedding,
            self.settings.vector_top_k,
            self.settings.vector_score_threshold,
            None,
        );

        let mut candidates = Vec::with_capacity(hits.len());
        for hit in hits {
            let Ok(artwork_id) = hit.id.parse::<i64>() else {
                log::debug!("Ignoring non-catalog vector id '{}'", hit.id);
                continue;
            };
            if artwork_id == detected.id {
                continue;
            }
            match self.db.with_conn(|c| artwork_repo::find_by_id(c, artwork_id)) {
                Ok(Some(artwork)) => {
                    let score = hit.score.clamp(0.0, 1.0);
                    candidates.push(MatchCandidate::from_artwork(artwork, score));
                }
                Ok(None) => log::debug!("Vector hit {} no longer in catalog", artwork_id),
                Err(e) => {
                    log::warn!("Vector match lookup failed, using metadata fallback: {}", e);
                    return Vec::new();
                }
            }
        }
        candidates
    }

    fn heuristic_candidates(
        &self,
        detected: &ArtworkRow,
    ) -> Result<Vec<MatchCandidate>, DatabaseError> {
        let window = self.settings.year_window;
        let filter = MetadataFilter {
            exclude_id: detected.id,
            format_type: detected.format_type.as_deref(),
            year_range: detected.year.map(|y| (y - window, y + window)),
            limit: self.settings.heuristic_limit,
        };
        let rows = self.db.with_conn(|c| artwork_repo::find_by_metadata(c, &filter))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let score = heuristic_score(detected, &row, self.settings.heuristic_cap);
                MatchCandidate::from_artwork(row, score)
            })
            .collect())
    }
}

/// Metadata similarity between the detected artwork and a candidate.
pub fn heuristic_score(detected: &ArtworkRow, candidate: &ArtworkRow, cap: f32) -> f32 {
    let mut score = HEURISTIC_BASE;

    // Two artworks with no recorded format count as the same format.
    if candidate.format_type == detected.format_type {
        score += FORMAT_BONUS;
    }

    if let (Some(a), Some(b)) = (detected.year, candidate.year) {
        let diff = (a - b).abs();
        if diff <= 5 {
            score += CLOSE_YEAR_BONUS;
        } else if diff <= 10 {
            score += NEAR_YEAR_BONUS;
        }
    }

    score.min(cap)
}
