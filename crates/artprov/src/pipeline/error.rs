use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No artworks in catalog to match against")]
    NoCandidates,

    #[error("Installation photo with ID {0} not found")]
    PhotoMissing(i64),

    #[error("{0}")]
    Database(#[from] DatabaseError),
}
