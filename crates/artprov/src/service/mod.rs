//! Operations exposed to the HTTP layer.
//!
//! [`ProvenanceService`] owns the database handle, the job store, the
//! worker pool and the vector index, and wires them into the operations
//! callers need. Everything except photo submission runs synchronously.

use std::sync::Arc;

use crate::broadcast::{
    DetectionJob, InMemoryJobStore, JobProgressBroadcaster, JobStatus, JobStore, JobUpdate,
};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::confirmation::{self, ConfirmationResponse};
use crate::db::photo_repo::{self, ProcessedStatus};
use crate::db::{artwork_repo, default_database_path, detection_repo, exhibition_repo, Database};
use crate::error::{ArtprovError, ConfigError, Entity, ServiceError};
use crate::matching::MatchResolver;
use crate::pipeline::PipelineConfig;
use crate::provenance::{self, ProvenanceResponse};
use crate::vector::VectorIndex;
use crate::worker::{PhotoJob, WorkerPool};

pub mod responses;

pub use responses::{MatchesResponse, PhotoDetectionsResponse, SubmitPhotoResponse};

pub struct ProvenanceService {
    db: Database,
    store: Arc<dyn JobStore>,
    broadcaster: Option<JobProgressBroadcaster>,
    pool: WorkerPool,
    resolver: MatchResolver,
    catalog: Catalog,
    index: VectorIndex,
}

impl ProvenanceService {
    /// Opens the configured database, connects the vector index and starts
    /// the workers.
    pub fn from_config(config: &Config) -> Result<Self, ArtprovError> {
        let db = if config.in_memory {
            Database::open_in_memory()?
        } else {
            let path = match &config.database_path {
                Some(path) => path.clone(),
                None => default_database_path().ok_or_else(|| ConfigError::Validation {
                    message: "Cannot determine home directory for the default database path"
                        .to_string(),
                })?,
            };
            Database::open(&path)?
        };

        let index = VectorIndex::connect(&config.vector_index);
        let broadcaster = JobProgressBroadcaster::default();
        let store: Arc<dyn JobStore> =
            Arc::new(InMemoryJobStore::with_broadcaster(broadcaster.clone()));

        let mut service = Self::new(db, config, index, store)?;
        service.broadcaster = Some(broadcaster);
        Ok(service)
    }

    pub fn new(
        db: Database,
        config: &Config,
        index: VectorIndex,
        store: Arc<dyn JobStore>,
    ) -> Result<Self, ArtprovError> {
        let pipeline_config = Arc::new(PipelineConfig::from_config(config));
        let pool = WorkerPool::new(
            db.clone(),
            pipeline_config,
            Arc::clone(&store),
            config.pipeline.worker_count,
        )?;

        Ok(Self {
            resolver: MatchResolver::new(db.clone(), index.clone(), config.matching.clone()),
            catalog: Catalog::new(db.clone(), index.clone()),
            index,
            db,
            store,
            broadcaster: None,
            pool,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn vector_index(&self) -> &VectorIndex {
        &self.index
    }

    /// Stream of job transitions, when the service was built with a
    /// broadcaster.
    pub fn subscribe(
        &self,
    ) -> Option<tokio::sync::broadcast::Receiver<crate::broadcast::JobProgressEvent>> {
        self.broadcaster.as_ref().map(|b| b.subscribe())
    }

    /// Registers a photo and queues it for detection. Returns immediately.
    pub fn submit_photo(
        &self,
        exhibition_id: i64,
        photo_url: &str,
    ) -> Result<SubmitPhotoResponse, ServiceError> {
        let photo_id = self.db.with_conn(|c| {
            if exhibition_repo::find_by_id(c, exhibition_id)?.is_none() {
                return Ok(None);
            }
            photo_repo::insert(c, exhibition_id, photo_url).map(Some)
        })?;
        let photo_id =
            photo_id.ok_or_else(|| ServiceError::not_found(Entity::Exhibition, exhibition_id))?;

        let job = DetectionJob::new(photo_id, "Photo queued for processing");
        let job_id = job.job_id.clone();
        self.store.put(job);

        if let Err(e) = self.pool.submit(PhotoJob::new(&job_id, photo_id)) {
            log::error!("Failed to queue job {}: {}", job_id, e);
            if let Err(update_err) = self
                .store
                .update_progress(&job_id, JobUpdate::failed(e.to_string()))
            {
                log::warn!("Failed to mark job {} failed: {}", job_id, update_err);
            }
            if let Err(db_err) = self
                .db
                .with_conn(|c| photo_repo::update_status(c, photo_id, ProcessedStatus::Failed))
            {
                log::warn!("Failed to mark photo {} failed: {}", photo_id, db_err);
            }
            return Err(e.into());
        }

        log::info!("Queued photo {} as job {}", photo_id, job_id);
        Ok(SubmitPhotoResponse {
            job_id,
            installation_photo_id: photo_id,
            status: JobStatus::Pending,
            message: "Photo submitted for processing".to_string(),
        })
    }

    pub fn job_status(&self, job_id: &str) -> Result<DetectionJob, ServiceError> {
        self.store
            .get(job_id)
            .ok_or_else(|| ServiceError::not_found(Entity::Job, job_id))
    }

    pub fn photo_detections(&self, photo_id: i64) -> Result<PhotoDetectionsResponse, ServiceError> {
        let (photo, detections) = self.db.with_conn(|c| {
            let photo = photo_repo::find_by_id(c, photo_id)?;
            let detections = match photo {
                Some(_) => detection_repo::list_for_photo(c, photo_id)?,
                None => Vec::new(),
            };
            Ok((photo, detections))
        })?;
        let photo =
            photo.ok_or_else(|| ServiceError::not_found(Entity::InstallationPhoto, photo_id))?;

        Ok(PhotoDetectionsResponse {
            installation_photo_id: photo.id,
            photo_url: photo.photo_url,
            exhibition_name: photo.exhibition_name,
            processed_status: photo.processed_status,
            total_detections: detections.len(),
            detections,
        })
    }

    /// Ranked alternatives for a detection. Never fails because of the
    /// vector index.
    pub fn get_matches(&self, detection_id: i64) -> Result<MatchesResponse, ServiceError> {
        let (detection, artwork) = self.db.with_conn(|c| {
            let Some(detection) = detection_repo::find_by_id(c, detection_id)? else {
                return Ok((None, None));
            };
            let artwork = artwork_repo::find_by_id(c, detection.artwork_id)?;
            Ok((Some(detection), artwork))
        })?;
        let detection =
            detection.ok_or_else(|| ServiceError::not_found(Entity::Detection, detection_id))?;
        let artwork = artwork
            .ok_or_else(|| ServiceError::not_found(Entity::Artwork, detection.artwork_id))?;

        let set = self.resolver.resolve(&artwork)?;

        Ok(MatchesResponse {
            detection_id,
            detected_artwork_id: artwork.id,
            detected_artwork_title: artwork.title,
            confidence_score: detection.confidence_score,
            total_matches: set.candidates.len(),
            similar_artworks: set.candidates,
            source: set.source,
        })
    }

    pub fn confirm_match(
        &self,
        detection_id: i64,
        artwork_id: i64,
    ) -> Result<ConfirmationResponse, ServiceError> {
        confirmation::confirm_match(&self.db, detection_id, artwork_id)
    }

    pub fn artwork_provenance(&self, artwork_id: i64) -> Result<ProvenanceResponse, ServiceError> {
        provenance::artwork_provenance(&self.db, artwork_id)
    }

    /// Stops accepting photos. Later submissions fail with a closed queue.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// Waits for running jobs and fails the ones still queued.
    pub fn wait(self) {
        self.pool.shutdown();
        self.pool.wait();
    }
}
