pub mod job_progress;
pub mod job_store;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent, JobStatus};
pub use job_store::{DetectionJob, InMemoryJobStore, JobStore, JobUpdate};
