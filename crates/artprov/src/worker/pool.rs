use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use crate::broadcast::job_store::{JobStore, JobUpdate};
use crate::db::photo_repo::{self, ProcessedStatus};
use crate::db::Database;
use crate::error::WorkerError;
use crate::pipeline::progress::StoreProgress;
use crate::pipeline::{DetectionPipeline, DetectionSampler, PipelineConfig, PipelineContext};
use crate::worker::job::PhotoJob;

/// Background workers that own every job-state change after submission.
///
/// Each job is handled by exactly one worker, so each job has a single
/// writer.
pub struct WorkerPool {
    job_sender: Sender<PhotoJob>,
    /// Kept to fail jobs still queued at shutdown.
    job_receiver: Receiver<PhotoJob>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    store: Arc<dyn JobStore>,
    db: Database,
}

impl WorkerPool {
    pub fn new(
        db: Database,
        config: Arc<PipelineConfig>,
        store: Arc<dyn JobStore>,
        worker_count: usize,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }
        let (job_sender, job_receiver) = unbounded::<PhotoJob>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_store = Arc::clone(&store);
            // Distinct streams per worker when a seed is fixed.
            let seed = config.rng_seed.map(|s| s.wrapping_add(worker_id as u64));
            let sampler = DetectionSampler::from_seed(seed, config.max_detections);
            let pipeline = DetectionPipeline::new(db.clone(), Arc::clone(&config), sampler);

            let handle = thread::Builder::new()
                .name(format!("detection-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, job_rx, shutdown_flag, pipeline, worker_store);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} detection workers", worker_count);

        Ok(Self {
            job_sender,
            job_receiver,
            workers,
            shutdown,
            store,
            db,
        })
    }

    /// Enqueues a job without waiting for it to run.
    pub fn submit(&self, job: PhotoJob) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Joins all workers, then fails any job still waiting in the queue.
    pub fn wait(self) {
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        for job in self.job_receiver.try_iter() {
            let update = JobUpdate::failed("Worker pool shut down before processing");
            if let Err(e) = self.store.update_progress(&job.job_id, update) {
                warn!("Failed to mark abandoned job {}: {}", job.job_id, e);
            }
            let photo_id = job.installation_photo_id;
            if let Err(e) = self
                .db
                .with_conn(|c| photo_repo::update_status(c, photo_id, ProcessedStatus::Failed))
            {
                warn!("Failed to mark photo {} failed: {}", photo_id, e);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<PhotoJob>,
    shutdown: Arc<AtomicBool>,
    pipeline: DetectionPipeline,
    store: Arc<dyn JobStore>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => {
                debug!(
                    "Worker {} processing job {} (photo {})",
                    worker_id, job.job_id, job.installation_photo_id
                );

                let progress = StoreProgress::new(Arc::clone(&store), &job.job_id);
                let (result, _ctx) = pipeline.run(PipelineContext::new(job), &progress);

                if result.success {
                    info!("Job {} finished: {}", result.job_id, result.message);
                } else {
                    warn!(
                        "Job {} failed: {}",
                        result.job_id,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{DetectionJob, InMemoryJobStore, JobStatus};
    use crate::db::artwork_repo::{self, NewArtwork};
    use crate::db::exhibition_repo::{self, NewExhibition};
    use crate::db::photo_repo;
    use std::time::Instant;

    fn test_config() -> Arc<PipelineConfig> {
        Arc::new(PipelineConfig {
            candidate_limit: 10,
            max_detections: 3,
            processing_delay: Duration::ZERO,
            rng_seed: Some(1),
        })
    }

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let photo_id = db
            .with_conn(|c| {
                let exhibition_id = exhibition_repo::insert(
                    c,
                    &NewExhibition {
                        name: "E".to_string(),
                        venue: "V".to_string(),
                        start_date: None,
                        end_date: None,
                    },
                )?;
                artwork_repo::insert(
                    c,
                    &NewArtwork {
                        title: "Only".to_string(),
                        ..Default::default()
                    },
                    None,
                )?;
                photo_repo::insert(c, exhibition_id, "u")
            })
            .unwrap();
        (db, photo_id)
    }

    fn wait_for_terminal(store: &InMemoryJobStore, job_id: &str) -> DetectionJob {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let job = store.get(job_id).unwrap();
            if job.is_finished() || Instant::now() > deadline {
                return job;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_worker_pool_creation() {
        let (db, _) = setup();
        let store = Arc::new(InMemoryJobStore::new());
        let pool = WorkerPool::new(db, test_config(), store, 2).unwrap();

        assert!(!pool.is_shutdown());

        pool.shutdown();
        assert!(pool.is_shutdown());

        pool.wait();
    }

    #[test]
    fn test_zero_workers_rejected() {
        let (db, _) = setup();
        let store = Arc::new(InMemoryJobStore::new());
        assert!(matches!(
            WorkerPool::new(db, test_config(), store, 0),
            Err(WorkerError::SpawnFailed(_))
        ));
    }

    #[test]
    fn test_submit_and_process_job() {
        let (db, photo_id) = setup();
        let store = Arc::new(InMemoryJobStore::new());
        let pool = WorkerPool::new(db, test_config(), store.clone(), 1).unwrap();

        let job = DetectionJob::new(photo_id, "Photo queued for processing");
        let job_id = job.job_id.clone();
        store.put(job);
        pool.submit(PhotoJob::new(&job_id, photo_id)).unwrap();

        let finished = wait_for_terminal(&store, &job_id);
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.progress_percentage, 100);
        assert_eq!(finished.message, "Successfully detected 1 artworks");

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_wait_fails_queued_jobs() {
        let (db, photo_id) = setup();
        let second_photo = db
            .with_conn(|c| {
                let photo = photo_repo::find_by_id(c, photo_id)?.unwrap();
                photo_repo::insert(c, photo.exhibition_id, "v")
            })
            .unwrap();
        let store = Arc::new(InMemoryJobStore::new());
        let config = Arc::new(PipelineConfig {
            processing_delay: Duration::from_millis(300),
            ..PipelineConfig::default()
        });
        let pool = WorkerPool::new(db.clone(), config, store.clone(), 1).unwrap();

        let first = DetectionJob::new(photo_id, "queued");
        let second = DetectionJob::new(second_photo, "queued");
        let (first_id, second_id) = (first.job_id.clone(), second.job_id.clone());
        store.put(first);
        store.put(second);
        pool.submit(PhotoJob::new(&first_id, photo_id)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while store.get(&first_id).unwrap().status == JobStatus::Pending {
            assert!(Instant::now() < deadline, "first job never started");
            thread::sleep(Duration::from_millis(5));
        }
        pool.submit(PhotoJob::new(&second_id, second_photo)).unwrap();

        pool.shutdown();
        pool.wait();

        assert_eq!(store.get(&first_id).unwrap().status, JobStatus::Completed);
        let abandoned = store.get(&second_id).unwrap();
        assert_eq!(abandoned.status, JobStatus::Failed);
        assert_eq!(
            abandoned.error_details.as_deref(),
            Some("Worker pool shut down before processing")
        );
        let photo = db
            .with_conn(|c| photo_repo::find_by_id(c, second_photo))
            .unwrap()
            .unwrap();
        assert_eq!(photo.processed_status, ProcessedStatus::Failed);
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let (db, photo_id) = setup();
        let store = Arc::new(InMemoryJobStore::new());
        let pool = WorkerPool::new(db, test_config(), store, 1).unwrap();
        pool.shutdown();

        let result = pool.submit(PhotoJob::new("late", photo_id));
        assert!(matches!(result, Err(WorkerError::ChannelClosed)));
        pool.wait();
    }
}
