//! Error types for bedplate.

use thiserror::Error;

/// Errors raised at the validation seams of the plate engines.
///
/// The collision and arrangement engines themselves never fail on numeric
/// problems; bad objects are isolated and reported as data instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A mesh, footprint or object failed validation.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The plate descriptor is unusable.
    #[error("invalid plate bounds: {0}")]
    InvalidBoundary(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The worker thread is gone (panicked or shut down).
    #[error("collision worker disconnected")]
    WorkerDisconnected,

    /// A message could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Unexpected internal state.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout bedplate.
pub type Result<T> = std::result::Result<T, Error>;
