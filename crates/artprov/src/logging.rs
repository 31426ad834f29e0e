//! Process-wide log and span output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::LogFormat;
use crate::error::ArtprovError;

/// Installs the global subscriber. `RUST_LOG` wins over `level`.
///
/// `log` records from library code are forwarded into the same subscriber.
/// A second call returns an error and leaves the first setup in place.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), ArtprovError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ArtprovError::Logging(format!("invalid log level '{}': {}", level, e)))?;

    tracing_log::LogTracer::init().map_err(|e| ArtprovError::Logging(e.to_string()))?;

    let registry = Registry::default().with(filter);
    let result = match format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(fmt::layer().with_target(true)))
        }
    };
    result.map_err(|e| ArtprovError::Logging(e.to_string()))
}
