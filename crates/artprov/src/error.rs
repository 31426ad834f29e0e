use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtprovError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Kinds of catalog entities that a lookup can miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Artwork,
    Exhibition,
    InstallationPhoto,
    Detection,
    Job,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Artwork => write!(f, "Artwork"),
            Entity::Exhibition => write!(f, "Exhibition"),
            Entity::InstallationPhoto => write!(f, "Installation photo"),
            Entity::Detection => write!(f, "Detection"),
            Entity::Job => write!(f, "Job"),
        }
    }
}

/// Errors surfaced to callers of the synchronous service operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("Vector service is currently unavailable")]
    VectorIndexUnavailable,

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

impl ServiceError {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true for the not-found class of failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}

/// Rejected job-state updates.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("Job {0} not found")]
    UnknownJob(String),

    #[error("Job {job_id} is already {status} and cannot change")]
    Terminal {
        job_id: String,
        status: crate::broadcast::JobStatus,
    },

    #[error("Job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: crate::broadcast::JobStatus,
        to: crate::broadcast::JobStatus,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ArtprovError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = ServiceError::not_found(Entity::Detection, 42);
        assert_eq!(err.to_string(), "Detection with ID 42 not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_database_error_is_not_not_found() {
        let err = ServiceError::Database(crate::db::DatabaseError::LockPoisoned);
        assert!(!err.is_not_found());
    }
}
