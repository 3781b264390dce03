use ldk_types::{Location, TypeError};
use thiserror::Error;

/// Errors from classpath resolution and loader units.
#[derive(Debug, Error)]
pub enum ClasspathError {
    /// I/O error while reading a directory or archive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A classpath element could not be parsed as a location.
    #[error("invalid location: {0}")]
    InvalidLocation(#[from] TypeError),

    /// The archive could not be read as a zip file.
    #[error("invalid archive {location}: {reason}")]
    InvalidArchive { location: Location, reason: String },

    /// The archive does not begin with a local file header.
    #[error("archive {0} does not start with a local file header")]
    BadArchiveHeader(Location),

    /// The unit (or the archive backing a resource) has been closed.
    #[error("loader unit {0} is closed")]
    Closed(Location),

    /// No loader unit exists for this kind of location.
    #[error("unsupported scheme {scheme:?} for {location}")]
    UnsupportedScheme { scheme: String, location: Location },

    /// The archive manifest is malformed.
    #[error("malformed manifest: {0}")]
    Manifest(String),
}

/// Result alias for classpath operations.
pub type ClasspathResult<T> = Result<T, ClasspathError>;
