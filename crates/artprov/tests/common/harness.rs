//! Test harness for isolated service execution.
//!
//! Each `TestHarness` owns a fresh in-memory database, a job store with a
//! progress broadcaster and a running worker pool with no simulated delay.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::broadcast::Receiver;

use artprov::db::artwork_repo::{self, ArtworkRow, NewArtwork};
use artprov::db::detection_repo::{self, DetectionRow, NewDetection};
use artprov::db::exhibition_repo::{self, NewExhibition};
use artprov::db::photo_repo::{self, PhotoRow};
use artprov::embedding::embedding_for_artwork;
use artprov::seed::{seed_demo_catalog, SeedSummary};
use artprov::{
    Config, Database, DetectionJob, InMemoryJobStore, JobProgressBroadcaster, JobProgressEvent,
    JobStore, ProvenanceService, VectorIndex,
};

const TERMINAL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestHarness {
    pub service: ProvenanceService,
    pub db: Database,
    pub store: Arc<InMemoryJobStore>,
    broadcaster: JobProgressBroadcaster,
}

impl TestHarness {
    /// Harness with the vector index disabled.
    pub fn new() -> Self {
        Self::with_index(VectorIndex::Disabled)
    }

    pub fn with_index(index: VectorIndex) -> Self {
        let mut config = Config {
            in_memory: true,
            ..Config::default()
        };
        config.pipeline.processing_delay_ms = 0;
        config.pipeline.rng_seed = Some(42);
        Self::with_config(config, index)
    }

    pub fn with_config(config: Config, index: VectorIndex) -> Self {
        let db = Database::open_in_memory().expect("Failed to open test database");
        let broadcaster = JobProgressBroadcaster::default();
        let store = Arc::new(InMemoryJobStore::with_broadcaster(broadcaster.clone()));
        let dyn_store: Arc<dyn JobStore> = store.clone();
        let service = ProvenanceService::new(db.clone(), &config, index, dyn_store)
            .expect("Failed to start service");

        Self {
            service,
            db,
            store,
            broadcaster,
        }
    }

    pub fn subscribe(&self) -> Receiver<JobProgressEvent> {
        self.broadcaster.subscribe()
    }

    pub fn seed(&self) -> SeedSummary {
        seed_demo_catalog(&self.db, self.service.vector_index()).expect("Failed to seed catalog")
    }

    /// Inserts an artwork with an embedding computed from its metadata.
    pub fn add_artwork(&self, artwork: NewArtwork) -> ArtworkRow {
        let embedding =
            embedding_for_artwork(&artwork.title, artwork.year, artwork.format_type.as_deref());
        self.db
            .with_conn(|c| {
                let id = artwork_repo::insert(c, &artwork, Some(&embedding))?;
                artwork_repo::find_by_id(c, id)
            })
            .expect("Failed to insert artwork")
            .expect("Inserted artwork missing")
    }

    pub fn add_exhibition(&self, exhibition: NewExhibition) -> i64 {
        self.db
            .with_conn(|c| exhibition_repo::insert(c, &exhibition))
            .expect("Failed to insert exhibition")
    }

    /// Creates a photo with one detection pointing at `artwork_id`.
    pub fn add_detection(&self, exhibition_id: i64, artwork_id: i64, confidence: f64) -> i64 {
        self.db
            .with_conn(|c| {
                let photo_id = photo_repo::insert(c, exhibition_id, "https://example.com/p.jpg")?;
                detection_repo::insert(
                    c,
                    &NewDetection {
                        installation_photo_id: photo_id,
                        artwork_id,
                        confidence_score: confidence,
                        bounding_box: None,
                    },
                )
            })
            .expect("Failed to insert detection")
    }

    pub fn detection(&self, id: i64) -> DetectionRow {
        self.db
            .with_conn(|c| detection_repo::find_by_id(c, id))
            .expect("Failed to read detection")
            .expect("Detection missing")
    }

    pub fn photo(&self, id: i64) -> PhotoRow {
        self.db
            .with_conn(|c| photo_repo::find_by_id(c, id))
            .expect("Failed to read photo")
            .expect("Photo missing")
    }

    /// Polls the job until it is completed or failed.
    pub fn wait_for_terminal(&self, job_id: &str) -> DetectionJob {
        let deadline = Instant::now() + TERMINAL_TIMEOUT;
        loop {
            let job = self.service.job_status(job_id).expect("Job vanished");
            if job.is_finished() {
                return job;
            }
            assert!(
                Instant::now() < deadline,
                "Job {} did not finish: {:?}",
                job_id,
                job
            );
            thread::sleep(Duration::from_millis(10));
        }
    }
}
