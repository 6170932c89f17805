//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing or stitching a page
#[derive(Error, Debug)]
pub enum Error {
    /// The target is a privileged or restricted surface that cannot be scripted
    #[error("Cannot capture target: {0}")]
    UnreachableTarget(String),

    /// Failed to initialize the backend
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load a URL
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// The viewport-capture primitive failed for one tile
    #[error("Viewport capture failed: {0}")]
    CaptureError(String),

    /// Failed to execute a page script
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// A tile's raster data could not be decoded during stitching
    #[error("Failed to decode tile image: {0}")]
    DecodeError(String),

    /// Compositing the tile sequence failed
    #[error("Stitching failed: {0}")]
    StitchError(String),

    /// No tiles were produced at all
    #[error("no images captured")]
    EmptyResult,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
