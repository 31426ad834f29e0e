//! Vector similarity index.
//!
//! [`VectorIndex`] is either `Connected` to a backend or `Disabled`. The
//! variant is chosen once at construction and never changes; a failed
//! connection attempt yields `Disabled` for the lifetime of the value.
//! Every operation on `Disabled` returns its empty result, and backend
//! errors on `Connected` are logged and turned into the same empty results,
//! so callers never see an error from the index.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::{VectorBackendKind, VectorIndexConfig};
use crate::secrets::resolve_secret_optional;

pub mod memory;
pub mod pinecone;

pub use memory::MemoryBackend;
pub use pinecone::PineconeBackend;

/// Metadata stored next to a vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Index returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode index response: {0}")]
    Decode(String),

    #[error("Vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// One query hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_vector_count: u64,
    pub dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_fullness: Option<f64>,
}

/// A reachable similarity-search service.
pub trait VectorBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> Result<(), VectorError>;

    /// Nearest neighbours of `vector`, best first, at most `top_k`.
    /// `filter` keeps only entries whose metadata equals every given key.
    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<VectorMatch>, VectorError>;

    fn fetch(&self, id: &str) -> Result<Option<Vec<f32>>, VectorError>;

    fn delete(&self, id: &str) -> Result<(), VectorError>;

    fn stats(&self) -> Result<IndexStats, VectorError>;
}

#[derive(Clone, Default)]
pub enum VectorIndex {
    Connected(Arc<dyn VectorBackend>),
    #[default]
    Disabled,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorIndex::Connected(backend) => write!(f, "VectorIndex::Connected({})", backend.name()),
            VectorIndex::Disabled => write!(f, "VectorIndex::Disabled"),
        }
    }
}

impl VectorIndex {
    /// Builds the index described by `config`, degrading to `Disabled` on
    /// missing credentials or an unreachable service.
    pub fn connect(config: &VectorIndexConfig) -> Self {
        match config.backend {
            VectorBackendKind::Disabled => {
                log::info!("Vector index disabled by configuration");
                VectorIndex::Disabled
            }
            VectorBackendKind::Memory => {
                log::info!("Using in-process vector index '{}'", config.index_name);
                Self::memory(config.dimension)
            }
            VectorBackendKind::Pinecone => Self::connect_pinecone(config),
        }
    }

    fn connect_pinecone(config: &VectorIndexConfig) -> Self {
        let api_key = match resolve_secret_optional(
            config.api_key.as_deref(),
            config.api_key_file.as_deref(),
            config.api_key_env.as_deref(),
        ) {
            Ok(Some(key)) => key,
            Ok(None) => {
                log::warn!("Pinecone API key not configured, vector index unavailable");
                return VectorIndex::Disabled;
            }
            Err(e) => {
                log::warn!("Failed to resolve Pinecone API key: {}", e);
                return VectorIndex::Disabled;
            }
        };

        let Some(host) = config.host.as_deref() else {
            log::warn!(
                "No host configured for index '{}', vector index unavailable",
                config.index_name
            );
            return VectorIndex::Disabled;
        };

        let backend = match PineconeBackend::new(host, api_key, config.dimension, config.timeout_secs)
        {
            Ok(backend) => backend,
            Err(e) => {
                log::warn!("Failed to create Pinecone client: {}", e);
                return VectorIndex::Disabled;
            }
        };

        match backend.stats() {
            Ok(stats) => {
                log::info!(
                    "Connected to index '{}' ({} vectors)",
                    config.index_name,
                    stats.total_vector_count
                );
                VectorIndex::Connected(Arc::new(backend))
            }
            Err(e) => {
                log::warn!(
                    "Failed to connect to index '{}': {}, vector index unavailable",
                    config.index_name,
                    e
                );
                VectorIndex::Disabled
            }
        }
    }

    /// An empty in-process index.
    pub fn memory(dimension: usize) -> Self {
        VectorIndex::Connected(Arc::new(MemoryBackend::new(dimension)))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, VectorIndex::Connected(_))
    }

    /// Inserts or replaces a vector. Returns false on failure or when disabled.
    pub fn upsert(&self, id: &str, vector: &[f32], metadata: &Metadata) -> bool {
        let VectorIndex::Connected(backend) = self else {
            return false;
        };
        match backend.upsert(id, vector, metadata) {
            Ok(()) => {
                log::debug!("Upserted vector {}", id);
                true
            }
            Err(e) => {
                log::error!("Failed to upsert vector {}: {}", id, e);
                false
            }
        }
    }

    /// Similar vectors with `score >= score_threshold`, best first, at most
    /// `top_k`. Equal scores keep the backend's order.
    pub fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        score_threshold: f32,
        filter: Option<&Metadata>,
    ) -> Vec<VectorMatch> {
        let VectorIndex::Connected(backend) = self else {
            return Vec::new();
        };
        if top_k == 0 {
            return Vec::new();
        }
        match backend.query(vector, top_k, filter) {
            Ok(mut matches) => {
                matches.retain(|m| m.score >= score_threshold);
                matches.sort_by(|a, b| b.score.total_cmp(&a.score));
                matches.truncate(top_k);
                matches
            }
            Err(e) => {
                log::error!("Vector query failed: {}", e);
                Vec::new()
            }
        }
    }

    pub fn fetch(&self, id: &str) -> Option<Vec<f32>> {
        let VectorIndex::Connected(backend) = self else {
            return None;
        };
        backend.fetch(id).unwrap_or_else(|e| {
            log::error!("Failed to fetch vector {}: {}", id, e);
            None
        })
    }

    pub fn delete(&self, id: &str) -> bool {
        let VectorIndex::Connected(backend) = self else {
            return false;
        };
        match backend.delete(id) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to delete vector {}: {}", id, e);
                false
            }
        }
    }

    pub fn stats(&self) -> Option<IndexStats> {
        let VectorIndex::Connected(backend) = self else {
            return None;
        };
        backend
            .stats()
            .map_err(|e| log::error!("Failed to read index stats: {}", e))
            .ok()
    }
}
