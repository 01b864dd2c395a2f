//! Error types for the ingestion pipeline

use crate::models::PersonId;
use swapi_common::ConfigError;
use thiserror::Error;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Run-level failures.
///
/// Record-level problems (missing records, missing fields) never show up
/// here; the persister drops those records and logs them.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Fetching person {id} failed: {source}")]
    Transport {
        id: PersonId,
        #[source]
        source: reqwest::Error,
    },

    #[error("Person {id} returned an unexpected body: {reason}")]
    UnexpectedBody { id: PersonId, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Wave {wave} has {expected} identifiers but {actual} fetch results")]
    BatchMismatch {
        wave: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Persisting wave {wave} failed: {source}")]
    Persistence {
        wave: usize,
        #[source]
        source: Box<IngestError>,
    },

    #[error("Persistence task for wave {wave} panicked: {message}")]
    TaskPanicked { wave: usize, message: String },

    #[error("{failed} persistence task(s) failed; first failure: {first}")]
    Drain {
        failed: usize,
        #[source]
        first: Box<IngestError>,
    },
}

impl IngestError {
    /// Wrap a store failure with the wave it belongs to
    pub fn persistence(wave: usize, source: IngestError) -> Self {
        Self::Persistence {
            wave,
            source: Box::new(source),
        }
    }
}
