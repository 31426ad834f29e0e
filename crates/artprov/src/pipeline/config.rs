use std::time::Duration;

use crate::config::Config;

pub struct PipelineConfig {
    /// Upper bound on catalog artworks considered per photo.
    pub candidate_limit: u32,
    pub max_detections: usize,
    pub processing_delay: Duration,
    pub rng_seed: Option<u64>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            candidate_limit: config.pipeline.candidate_limit,
            max_detections: config.pipeline.max_detections,
            processing_delay: Duration::from_millis(config.pipeline.processing_delay_ms),
            rng_seed: config.pipeline.rng_seed,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
