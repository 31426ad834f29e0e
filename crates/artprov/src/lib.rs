pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod confirmation;
pub mod db;
pub mod embedding;
pub mod error;
pub mod logging;
pub mod matching;
pub mod pipeline;
pub mod provenance;
pub mod secrets;
pub mod seed;
pub mod service;
pub mod vector;
pub mod worker;

pub use broadcast::{
    DetectionJob, InMemoryJobStore, JobProgressBroadcaster, JobProgressEvent, JobStatus, JobStore,
    JobUpdate,
};
pub use catalog::{BulkEmbedRequest, BulkEmbedResponse, Catalog, IndexStatus};
pub use config::{load_config, Config};
pub use confirmation::ConfirmationResponse;
pub use db::Database;
pub use error::{
    ArtprovError, ConfigError, Entity, JobStoreError, Result, ServiceError, WorkerError,
};
pub use matching::{MatchCandidate, MatchResolver, MatchSource};
pub use pipeline::{DetectionPipeline, PipelineConfig, PipelineContext};
pub use provenance::{ProvenanceEntry, ProvenanceResponse};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use service::{MatchesResponse, PhotoDetectionsResponse, ProvenanceService, SubmitPhotoResponse};
pub use vector::{VectorIndex, VectorMatch};
