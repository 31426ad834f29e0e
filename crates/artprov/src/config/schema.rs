use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite file; defaults to `~/.artprov/data/artprov.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Use a throwaway in-memory database instead of `database_path`.
    #[serde(default)]
    pub in_memory: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub matching: MatchingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            in_memory: false,
            logging: LoggingConfig::default(),
            vector_index: VectorIndexConfig::default(),
            pipeline: PipelineSettings::default(),
            matching: MatchingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackendKind {
    /// Hosted Pinecone index over HTTPS.
    #[default]
    Pinecone,
    /// Exact in-process search.
    Memory,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    #[serde(default)]
    pub backend: VectorBackendKind,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    /// Index host, e.g. `https://artwork-embeddings-abc123.svc.pinecone.io`.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index_name() -> String {
    "artwork-embeddings".to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("PINECONE_API_KEY".to_string())
}

fn default_dimension() -> usize {
    crate::embedding::EMBEDDING_DIMENSION
}

fn default_metric() -> String {
    "cosine".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackendKind::default(),
            index_name: default_index_name(),
            host: None,
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
            dimension: default_dimension(),
            metric: default_metric(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Upper bound on catalog artworks sampled per photo.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: u32,
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,
    /// Simulated analysis time before detection starts.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,
    /// Fixed seed for reproducible detections.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_worker_count() -> usize {
    1
}

fn default_candidate_limit() -> u32 {
    10
}

fn default_max_detections() -> usize {
    3
}

fn default_processing_delay_ms() -> u64 {
    2000
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            candidate_limit: default_candidate_limit(),
            max_detections: default_max_detections(),
            processing_delay_ms: default_processing_delay_ms(),
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_vector_top_k")]
    pub vector_top_k: usize,
    #[serde(default = "default_vector_score_threshold")]
    pub vector_score_threshold: f32,
    #[serde(default = "default_heuristic_limit")]
    pub heuristic_limit: u32,
    /// Half-width of the year window for heuristic candidates.
    #[serde(default = "default_year_window")]
    pub year_window: i32,
    #[serde(default = "default_heuristic_cap")]
    pub heuristic_cap: f32,
}

fn default_vector_top_k() -> usize {
    10
}

fn default_vector_score_threshold() -> f32 {
    0.5
}

fn default_heuristic_limit() -> u32 {
    5
}

fn default_year_window() -> i32 {
    20
}

fn default_heuristic_cap() -> f32 {
    0.95
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            vector_top_k: default_vector_top_k(),
            vector_score_threshold: default_vector_score_threshold(),
            heuristic_limit: default_heuristic_limit(),
            year_window: default_year_window(),
            heuristic_cap: default_heuristic_cap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"version": "1.0"}"#).unwrap();
        assert!(config.database_path.is_none());
        assert!(!config.in_memory);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.vector_index.backend, VectorBackendKind::Pinecone);
        assert_eq!(config.vector_index.index_name, "artwork-embeddings");
        assert_eq!(
            config.vector_index.api_key_env.as_deref(),
            Some("PINECONE_API_KEY")
        );
        assert_eq!(config.vector_index.dimension, 512);
        assert_eq!(config.pipeline.worker_count, 1);
        assert_eq!(config.pipeline.candidate_limit, 10);
        assert_eq!(config.pipeline.max_detections, 3);
        assert_eq!(config.pipeline.processing_delay_ms, 2000);
        assert_eq!(config.matching.vector_top_k, 10);
        assert_eq!(config.matching.heuristic_limit, 5);
        assert_eq!(config.matching.year_window, 20);
        assert!((config.matching.vector_score_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.matching.heuristic_cap - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn test_enum_spellings() {
        let config: Config = serde_json::from_str(
            r#"{"version": "1.0", "logging": {"format": "json"}, "vector_index": {"backend": "memory"}}"#,
        )
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.vector_index.backend, VectorBackendKind::Memory);
    }
}
