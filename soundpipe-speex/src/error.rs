//! Speex backend error types.

use thiserror::Error;

/// Speex backend errors.
#[derive(Error, Debug)]
pub enum SpeexError {
    /// Unsupported channel count (mono and stereo only).
    #[error("Unsupported channel count: {0} (speech codec is mono/stereo)")]
    UnsupportedChannels(u8),

    /// Encoder configuration error.
    #[error("Encoder configuration error: {0}")]
    ConfigError(String),

    /// Invalid header packet.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid audio packet.
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Audio data arrived before the header handshake completed.
    #[error("Headers not complete")]
    MissingHeaders,

    /// Invalid audio data.
    #[error("Invalid audio data: {0}")]
    InvalidData(String),
}

/// Speex backend result type.
pub type Result<T> = std::result::Result<T, SpeexError>;

impl From<SpeexError> for soundpipe_core::Error {
    fn from(err: SpeexError) -> Self {
        soundpipe_core::Error::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpeexError::UnsupportedChannels(6);
        assert!(err.to_string().contains("mono/stereo"));
    }
}
