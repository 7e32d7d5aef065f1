//! Unified error types for govsync.

use crate::transport::TransportError;
use tokio_rusqlite::rusqlite;

/// Unified error types for the catalog store and ingestion engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., negative TTL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The collection an ingestion run targets is not stored locally.
    #[error("COLLECTION_NOT_FOUND: {0}")]
    CollectionNotFound(String),

    /// The package a granule run targets is not stored locally.
    #[error("PACKAGE_NOT_FOUND: {0}")]
    PackageNotFound(String),

    /// Remote listing or search failed.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(#[from] TransportError),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A structured blob could not be encoded or decoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is a precondition failure raised before any work.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::CollectionNotFound(_) | Error::PackageNotFound(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
