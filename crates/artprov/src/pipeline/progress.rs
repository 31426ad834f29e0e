use std::sync::{Arc, Mutex};

use crate::broadcast::job_store::{JobStore, JobUpdate};

/// Events emitted by the pipeline during processing.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Checkpoint { progress: u8, message: String },
    Completed { message: String },
    Failed { error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes pipeline events into the job store, which owns the state machine.
pub struct StoreProgress {
    store: Arc<dyn JobStore>,
    job_id: String,
}

impl StoreProgress {
    pub fn new(store: Arc<dyn JobStore>, job_id: &str) -> Self {
        Self {
            store,
            job_id: job_id.to_string(),
        }
    }
}

impl ProgressReporter for StoreProgress {
    fn report(&self, event: ProgressEvent) {
        let update = match event {
            ProgressEvent::Checkpoint { progress, message } => {
                JobUpdate::processing(progress, message)
            }
            ProgressEvent::Completed { message } => JobUpdate::completed(message),
            ProgressEvent::Failed { error } => JobUpdate::failed(error),
        };
        if let Err(e) = self.store.update_progress(&self.job_id, update) {
            log::warn!("Dropped progress update for job {}: {}", self.job_id, e);
        }
    }
}

/// Records every event; used by tests to assert on checkpoints.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
