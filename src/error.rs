//! Error types for the trip journal core.

use thiserror::Error;

/// Failure while reading from or writing to the record store.
///
/// Reported once to the caller; nothing in this crate retries automatically.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while producing a thumbnail from picked image bytes.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("image decode failed: {0}")]
    Decode(image::ImageError),

    #[error("thumbnail encode failed: {0}")]
    Encode(image::ImageError),
}

/// Failure while loading or applying the first-launch seed data.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("malformed seed JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
