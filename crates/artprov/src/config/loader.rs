use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Checks that survive deserialization regardless of the schema.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.pipeline.worker_count == 0 {
        return Err(invalid("pipeline.worker_count must be at least 1"));
    }
    if config.pipeline.candidate_limit == 0 {
        return Err(invalid("pipeline.candidate_limit must be at least 1"));
    }
    if config.pipeline.max_detections == 0 {
        return Err(invalid("pipeline.max_detections must be at least 1"));
    }

    if config.vector_index.dimension == 0 {
        return Err(invalid("vector_index.dimension must be greater than 0"));
    }
    if config.vector_index.dimension != crate::embedding::EMBEDDING_DIMENSION {
        return Err(invalid(format!(
            "vector_index.dimension must match the embedding dimension ({})",
            crate::embedding::EMBEDDING_DIMENSION
        )));
    }

    if config.matching.vector_top_k == 0 {
        return Err(invalid("matching.vector_top_k must be at least 1"));
    }
    if config.matching.heuristic_limit == 0 {
        return Err(invalid("matching.heuristic_limit must be at least 1"));
    }
    if config.matching.year_window < 0 {
        return Err(invalid("matching.year_window must not be negative"));
    }
    for (name, value) in [
        (
            "matching.vector_score_threshold",
            config.matching.vector_score_threshold,
        ),
        ("matching.heuristic_cap", config.matching.heuristic_cap),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(format!("{} must be within [0, 1]", name)));
        }
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_minimal_config() {
        let config = load_config_from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.pipeline.max_detections, 3);
    }

    #[test]
    fn test_load_full_config() {
        let json = r#"{
            "version": "1.0",
            "database_path": "/tmp/artprov-test.db",
            "logging": {"level": "debug", "format": "json"},
            "vector_index": {
                "backend": "memory",
                "index_name": "artwork-embeddings",
                "api_key_env": "MY_KEY",
                "dimension": 512,
                "metric": "cosine",
                "timeout_secs": 3
            },
            "pipeline": {
                "worker_count": 2,
                "candidate_limit": 20,
                "max_detections": 3,
                "processing_delay_ms": 0,
                "rng_seed": 42
            },
            "matching": {
                "vector_top_k": 5,
                "vector_score_threshold": 0.7,
                "heuristic_limit": 5,
                "year_window": 20,
                "heuristic_cap": 0.95
            }
        }"#;
        let config = load_config_from_str(json).unwrap();
        assert_eq!(config.pipeline.worker_count, 2);
        assert_eq!(config.pipeline.rng_seed, Some(42));
        assert_eq!(config.vector_index.timeout_secs, 3);
        assert_eq!(config.vector_index.api_key_env.as_deref(), Some("MY_KEY"));
        assert_eq!(config.matching.vector_top_k, 5);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"version": "1.0", "in_memory": true}}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(config.in_memory);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/artprov/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let err = load_config_from_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_schema_rejects_unknown_version() {
        let err = load_config_from_str(r#"{"version": "2.0"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_schema_rejects_unknown_keys() {
        let err = load_config_from_str(r#"{"version": "1.0", "extra": 1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_schema_rejects_out_of_range_threshold() {
        let err = load_config_from_str(
            r#"{"version": "1.0", "matching": {"vector_score_threshold": 1.5}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_schema_rejects_zero_workers() {
        let err = load_config_from_str(r#"{"version": "1.0", "pipeline": {"worker_count": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
    }

    #[test]
    fn test_semantic_validation_rejects_wrong_dimension() {
        let err = load_config_from_str(r#"{"version": "1.0", "vector_index": {"dimension": 128}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_validate_config_direct() {
        let mut config = Config::default();
        assert!(validate_config(&config).is_ok());

        config.matching.heuristic_cap = -0.1;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.version = "0.9".to_string();
        assert!(validate_config(&config).is_err());
    }
}
