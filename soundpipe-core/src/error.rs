//! Error types for the Soundpipe library.

use thiserror::Error;

/// Main error type for the Soundpipe library.
#[derive(Error, Debug)]
pub enum Error {
    /// Codec errors (encoding/decoding), carrying the backend's message.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unsupported feature or format.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// PCM buffer shape does not match the configured stream.
    #[error("Buffer mismatch: {0}")]
    BufferMismatch(String),

    /// End of stream reached.
    #[error("End of stream")]
    EndOfStream,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a codec error.
    pub fn codec(msg: impl Into<String>) -> Self {
        Error::Codec(msg.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create a buffer mismatch error.
    pub fn buffer_mismatch(msg: impl Into<String>) -> Self {
        Error::BufferMismatch(msg.into())
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_param("sample rate");
        assert_eq!(err.to_string(), "Invalid parameter: sample rate");
    }

    #[test]
    fn test_is_eof() {
        assert!(Error::EndOfStream.is_eof());
        assert!(!Error::codec("broken").is_eof());
    }
}
