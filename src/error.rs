//! Error types for the AR overlay pipeline library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Camera capture could not be acquired (no device, permission denied,
    /// device busy). Fatal to the pipeline; the session enters a terminal
    /// state with a retry entry point.
    #[error("Capture error: {0}")]
    Capture(String),

    /// Landmark detector failed on a single frame. Recovered locally by
    /// treating the frame as "no landmarks".
    #[error("Detector error: {0}")]
    Detector(String),

    /// Marker decode failed. Recovered locally as "marker absent this
    /// sample" and smoothed by the grace-period debounce.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Decode worker unavailable or crashed. The gate falls back to
    /// synchronous in-thread decoding.
    #[error("Worker error: {0}")]
    Worker(String),

    /// Renderer rejected a composed frame
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Image encoding or decoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Capture("no camera found".to_string());
        assert_eq!(err.to_string(), "Capture error: no camera found");

        let err = Error::Decode("buffer too short".to_string());
        assert!(err.to_string().contains("buffer too short"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
