//! Vorbis backend error types.

use thiserror::Error;

/// Vorbis backend errors.
#[derive(Error, Debug)]
pub enum VorbisError {
    /// Unsupported sample rate.
    #[error("Unsupported sample rate: {0}")]
    UnsupportedSampleRate(u32),

    /// Unsupported channel count.
    #[error("Unsupported channel count: {0}")]
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

/// Vorbis backend result type.
pub type Result<T> = std::result::Result<T, VorbisError>;

impl From<VorbisError> for soundpipe_core::Error {
    fn from(err: VorbisError) -> Self {
        soundpipe_core::Error::Codec(err.to_string())
    }
}
