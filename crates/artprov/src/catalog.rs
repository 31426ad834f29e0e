//! Catalog writes that keep stored embeddings and the vector index in step.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::artwork_repo::{self, ArtworkRow, NewArtwork};
use crate::db::Database;
use crate::embedding::embedding_for_artwork;
use crate::error::{Entity, ServiceError};
use crate::vector::{IndexStats, Metadata, VectorIndex};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkEmbedRequest {
    /// Explicit artworks; when absent, every artwork lacking an embedding.
    #[serde(default)]
    pub artwork_ids: Option<Vec<i64>>,
    /// With no explicit ids, re-embed the whole catalog.
    #[serde(default)]
    pub force_regenerate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkEmbedResponse {
    pub processed_count: usize,
    pub failed_count: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_artwork_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexStatus {
    Available(IndexStats),
    Unavailable,
}

pub struct Catalog {
    db: Database,
    index: VectorIndex,
}

impl Catalog {
    pub fn new(db: Database, index: VectorIndex) -> Self {
        Self { db, index }
    }

    /// Adds an artwork. An image reference triggers embedding and indexing.
    pub fn create_artwork(&self, artwork: &NewArtwork) -> Result<ArtworkRow, ServiceError> {
        let embedding = artwork.image_url.as_ref().map(|_| {
            embedding_for_artwork(&artwork.title, artwork.year, artwork.format_type.as_deref())
        });

        let row = self.db.with_conn(|c| {
            let id = artwork_repo::insert(c, artwork, embedding.as_deref())?;
            artwork_repo::find_by_id(c, id)
        })?;
        let row = row.ok_or_else(|| ServiceError::not_found(Entity::Artwork, "new"))?;

        if let Some(vector) = &embedding {
            self.index_artwork(&row, vector);
        }
        Ok(row)
    }

    /// Sets a new image reference and regenerates the embedding.
    pub fn update_image(&self, id: i64, image_url: &str) -> Result<ArtworkRow, ServiceError> {
        let row = self.db.with_transaction(|tx| {
            let mut row = artwork_repo::find_by_id(tx, id)?
                .ok_or_else(|| ServiceError::not_found(Entity::Artwork, id))?;
            let vector =
                embedding_for_artwork(&row.title, row.year, row.format_type.as_deref());
            artwork_repo::update_image_url(tx, id, image_url)?;
            artwork_repo::update_embedding(tx, id, Some(&vector))?;
            row.image_url = Some(image_url.to_string());
            row.vector_embedding = Some(vector);
            Ok::<_, ServiceError>(row)
        })?;

        if let Some(vector) = &row.vector_embedding {
            self.index_artwork(&row, vector);
        }
        Ok(row)
    }

    pub fn delete_artwork(&self, id: i64) -> Result<(), ServiceError> {
        let exists = self.db.with_conn(|c| artwork_repo::find_by_id(c, id))?.is_some();
        if !exists {
            return Err(ServiceError::not_found(Entity::Artwork, id));
        }
        if self.index.is_available() && !self.index.delete(&id.to_string()) {
            log::warn!("Artwork {} could not be removed from the vector index", id);
        }
        self.db.with_conn(|c| artwork_repo::delete(c, id))?;
        log::info!("Deleted artwork {}", id);
        Ok(())
    }

    /// Regenerates embeddings and pushes them to the index.
    ///
    /// Requires an available index; an artwork counts as processed only
    /// once the index accepted it.
    pub fn bulk_embed(&self, request: &BulkEmbedRequest) -> Result<BulkEmbedResponse, ServiceError> {
        if !self.index.is_available() {
            return Err(ServiceError::VectorIndexUnavailable);
        }

        let artworks = self.db.with_conn(|c| match &request.artwork_ids {
            Some(ids) => artwork_repo::find_many(c, ids),
            None if request.force_regenerate => artwork_repo::list(c, None),
            None => artwork_repo::list_without_embedding(c),
        })?;

        let mut processed_count = 0;
        let mut failed_artwork_ids = Vec::new();

        for artwork in &artworks {
            let vector =
                embedding_for_artwork(&artwork.title, artwork.year, artwork.format_type.as_deref());
            if let Err(e) = self
                .db
                .with_conn(|c| artwork_repo::update_embedding(c, artwork.id, Some(&vector)))
            {
                log::error!("Failed to store embedding for artwork {}: {}", artwork.id, e);
                failed_artwork_ids.push(artwork.id);
                continue;
            }
            if self.index_artwork(artwork, &vector) {
                processed_count += 1;
            } else {
                failed_artwork_ids.push(artwork.id);
            }
        }

        let failed_count = failed_artwork_ids.len();
        log::info!(
            "Bulk embedding finished: {} processed, {} failed",
            processed_count,
            failed_count
        );
        Ok(BulkEmbedResponse {
            processed_count,
            failed_count,
            message: format!("Processed {} artworks, {} failed", processed_count, failed_count),
            failed_artwork_ids,
        })
    }

    pub fn index_stats(&self) -> IndexStatus {
        match self.index.stats() {
            Some(stats) => IndexStatus::Available(stats),
            None => IndexStatus::Unavailable,
        }
    }

    fn index_artwork(&self, artwork: &ArtworkRow, vector: &[f32]) -> bool {
        if !self.index.is_available() {
            return false;
        }
        self.index
            .upsert(&artwork.id.to_string(), vector, &index_metadata(artwork))
    }
}

/// Metadata stored with an artwork's vector.
pub fn index_metadata(artwork: &ArtworkRow) -> Metadata {
    let value = json!({
        "title": artwork.title,
        "year": artwork.year,
        "format_type": artwork.format_type,
        "dimensions": artwork.dimensions,
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => Metadata::new(),
    }
}
