//! Ephemeral job store for detection jobs.
//!
//! Jobs live for the lifetime of the process only. The store is injected
//! wherever jobs are read or written; [`InMemoryJobStore`] is the default.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::broadcast::job_progress::{JobProgressBroadcaster, JobProgressEvent, JobStatus};
use crate::error::JobStoreError;

// ─── DetectionJob ───────────────────────────────────────────────────────────

/// Snapshot of one photo-processing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionJob {
    pub job_id: String,
    pub installation_photo_id: i64,
    pub status: JobStatus,
    /// Monotonically non-decreasing within a job, 0 to 100.
    pub progress_percentage: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DetectionJob {
    /// Creates a pending job with a fresh identifier.
    pub fn new(installation_photo_id: i64, message: &str) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            installation_photo_id,
            status: JobStatus::Pending,
            progress_percentage: 0,
            message: message.to_string(),
            error_details: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Returns true if this job is finished (completed or failed).
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies an update, enforcing the state machine.
    ///
    /// Progress never moves backwards: a lower value than the current one
    /// is ignored.
    pub fn apply(&mut self, update: &JobUpdate) -> Result<(), JobStoreError> {
        if self.status.is_terminal() {
            return Err(JobStoreError::Terminal {
                job_id: self.job_id.clone(),
                status: self.status,
            });
        }
        if !self.status.can_transition_to(update.status) {
            return Err(JobStoreError::InvalidTransition {
                job_id: self.job_id.clone(),
                from: self.status,
                to: update.status,
            });
        }

        self.status = update.status;
        if let Some(progress) = update.progress {
            self.progress_percentage = self.progress_percentage.max(progress.min(100));
        }
        self.message = update.message.clone();
        if update.error_details.is_some() {
            self.error_details = update.error_details.clone();
        }
        if self.status.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    fn to_event(&self) -> JobProgressEvent {
        JobProgressEvent {
            job_id: self.job_id.clone(),
            installation_photo_id: self.installation_photo_id,
            status: self.status,
            progress_percentage: self.progress_percentage,
            message: self.message.clone(),
            timestamp: self.completed_at.unwrap_or_else(Utc::now),
            error: self.error_details.clone(),
        }
    }
}

// ─── JobUpdate ──────────────────────────────────────────────────────────────

/// A requested change to a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub message: String,
    pub error_details: Option<String>,
}

impl JobUpdate {
    /// A processing checkpoint.
    pub fn processing(progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Processing,
            progress: Some(progress),
            message: message.into(),
            error_details: None,
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            progress: Some(100),
            message: message.into(),
            error_details: None,
        }
    }

    /// A failure; progress stays where it was.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress: None,
            message: "Processing failed".to_string(),
            error_details: Some(error.into()),
        }
    }
}

// ─── JobStore ───────────────────────────────────────────────────────────────

/// Storage for job snapshots keyed by job ID.
pub trait JobStore: Send + Sync {
    /// Inserts or replaces a job.
    fn put(&self, job: DetectionJob);

    /// Returns a snapshot of the job, if known.
    fn get(&self, job_id: &str) -> Option<DetectionJob>;

    /// Applies an update and returns the resulting snapshot.
    fn update_progress(
        &self,
        job_id: &str,
        update: JobUpdate,
    ) -> Result<DetectionJob, JobStoreError>;
}

/// In-memory job store.
///
/// Uses `std::sync::RwLock`; readers may observe any intermediate checkpoint.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, DetectionJob>>,
    broadcaster: Option<JobProgressBroadcaster>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that publishes every change on `broadcaster`.
    pub fn with_broadcaster(broadcaster: JobProgressBroadcaster) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            broadcaster: Some(broadcaster),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, DetectionJob>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, DetectionJob>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn publish(&self, job: &DetectionJob) {
        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.send(job.to_event());
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn put(&self, job: DetectionJob) {
        let mut jobs = self.write();
        self.publish(&job);
        jobs.insert(job.job_id.clone(), job);
    }

    fn get(&self, job_id: &str) -> Option<DetectionJob> {
        self.read().get(job_id).cloned()
    }

    fn update_progress(
        &self,
        job_id: &str,
        update: JobUpdate,
    ) -> Result<DetectionJob, JobStoreError> {
        // Published under the lock so an observed state has already been sent.
        let mut jobs = self.write();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::UnknownJob(job_id.to_string()))?;
        job.apply(&update)?;
        let snapshot = job.clone();
        self.publish(&snapshot);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = DetectionJob::new(3, "Photo queued for processing");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress_percentage, 0);
        assert_eq!(job.installation_photo_id, 3);
        assert!(job.completed_at.is_none());
        assert!(Uuid::parse_str(&job.job_id).is_ok());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = DetectionJob::new(1, "m");
        let b = DetectionJob::new(1, "m");
        assert_ne!(a.job_id, b.job_id);
    }

    #[test]
    fn test_put_and_get() {
        let store = InMemoryJobStore::new();
        let job = DetectionJob::new(1, "queued");
        let id = job.job_id.clone();
        store.put(job.clone());

        assert_eq!(store.get(&id), Some(job));
        assert!(store.get("missing").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_progress_through_checkpoints() {
        let store = InMemoryJobStore::new();
        let job = DetectionJob::new(1, "queued");
        let id = job.job_id.clone();
        store.put(job);

        for (progress, message) in [(10, "a"), (50, "b"), (80, "c")] {
            let snapshot = store
                .update_progress(&id, JobUpdate::processing(progress, message))
                .unwrap();
            assert_eq!(snapshot.progress_percentage, progress);
            assert_eq!(snapshot.message, message);
        }

        let done = store
            .update_progress(&id, JobUpdate::completed("Successfully detected 2 artworks"))
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress_percentage, 100);
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_progress_never_decreases() {
        let store = InMemoryJobStore::new();
        let job = DetectionJob::new(1, "queued");
        let id = job.job_id.clone();
        store.put(job);

        store
            .update_progress(&id, JobUpdate::processing(50, "half"))
            .unwrap();
        let snapshot = store
            .update_progress(&id, JobUpdate::processing(10, "back"))
            .unwrap();
        assert_eq!(snapshot.progress_percentage, 50);
    }

    #[test]
    fn test_failure_keeps_progress_and_records_error() {
        let store = InMemoryJobStore::new();
        let job = DetectionJob::new(1, "queued");
        let id = job.job_id.clone();
        store.put(job);

        store
            .update_progress(&id, JobUpdate::processing(50, "Detecting"))
            .unwrap();
        let failed = store
            .update_progress(&id, JobUpdate::failed("boom"))
            .unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.progress_percentage, 50);
        assert_eq!(failed.message, "Processing failed");
        assert_eq!(failed.error_details.as_deref(), Some("boom"));
        assert!(failed.completed_at.is_some());
    }

    #[test]
    fn test_terminal_state_is_final() {
        let store = InMemoryJobStore::new();
        let job = DetectionJob::new(1, "queued");
        let id = job.job_id.clone();
        store.put(job);
        store
            .update_progress(&id, JobUpdate::processing(80, "Saving"))
            .unwrap();
        store.update_progress(&id, JobUpdate::completed("done")).unwrap();

        let err = store
            .update_progress(&id, JobUpdate::failed("late"))
            .unwrap_err();
        assert!(matches!(err, JobStoreError::Terminal { .. }));
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn test_processing_cannot_return_to_pending() {
        let mut job = DetectionJob::new(1, "queued");
        job.apply(&JobUpdate::processing(10, "start")).unwrap();

        let back = JobUpdate {
            status: JobStatus::Pending,
            progress: None,
            message: "again".to_string(),
            error_details: None,
        };
        assert!(matches!(
            job.apply(&back),
            Err(JobStoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_pending_cannot_complete_directly() {
        let store = InMemoryJobStore::new();
        let job = DetectionJob::new(1, "queued");
        let id = job.job_id.clone();
        store.put(job);

        let err = store
            .update_progress(&id, JobUpdate::completed("too early"))
            .unwrap_err();
        assert!(matches!(err, JobStoreError::InvalidTransition { .. }));
        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_unknown_job() {
        let store = InMemoryJobStore::new();
        let err = store
            .update_progress("nope", JobUpdate::processing(10, "x"))
            .unwrap_err();
        assert_eq!(err, JobStoreError::UnknownJob("nope".to_string()));
    }

    #[test]
    fn test_updates_are_broadcast() {
        let broadcaster = JobProgressBroadcaster::new(16);
        let mut rx = broadcaster.subscribe();
        let store = InMemoryJobStore::with_broadcaster(broadcaster);

        let job = DetectionJob::new(9, "queued");
        let id = job.job_id.clone();
        store.put(job);
        store
            .update_progress(&id, JobUpdate::processing(10, "Downloading"))
            .unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.status, JobStatus::Pending);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.progress_percentage, 10);
        assert_eq!(second.installation_photo_id, 9);
    }
}
