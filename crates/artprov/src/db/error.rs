//! Errors raised by the catalog and provenance store.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The parent directory of the catalog file could not be created.
    #[error("Cannot prepare catalog database at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog schema migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// An embedding or bounding box could not be encoded as JSON text.
    #[error("Invalid JSON in column '{column}': {source}")]
    Json {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A writer panicked while holding the shared connection.
    #[error("Catalog connection lock poisoned")]
    LockPoisoned,
}
