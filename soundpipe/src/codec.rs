//! Codec selection and backend plumbing.

use std::fmt;

use soundpipe_core::{Packet, PcmBlock, Result};
use soundpipe_speex::{SpeexConfig, SpeexDecoder, SpeexEncoder};
use soundpipe_vorbis::{VorbisConfig, VorbisDecoder, VorbisEncoder};

/// Codec selection for a sound stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCodec {
    /// Vorbis-class general audio codec.
    Vorbis,
    /// Speex-class speech codec (mono/stereo only).
    Speex,
}

impl SoundCodec {
    /// Codec name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Vorbis => soundpipe_vorbis::CODEC_NAME,
            Self::Speex => soundpipe_speex::CODEC_NAME,
        }
    }

    /// Maximum channel count the codec supports.
    pub const fn max_channels(&self) -> u8 {
        match self {
            Self::Vorbis => soundpipe_vorbis::MAX_CHANNELS,
            Self::Speex => soundpipe_speex::MAX_CHANNELS,
        }
    }

    /// Parse a codec name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "vorbis" => Some(Self::Vorbis),
            "speex" => Some(Self::Speex),
            _ => None,
        }
    }
}

impl fmt::Display for SoundCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parameters of a sound stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u8,
    /// Codec carrying the stream.
    pub codec: SoundCodec,
}

impl SoundInfo {
    /// Create a new stream description.
    pub fn new(sample_rate: u32, channels: u8, codec: SoundCodec) -> Self {
        Self {
            sample_rate,
            channels,
            codec,
        }
    }
}

/// Object-safe encoder operations implemented by every backend.
pub(crate) trait EncoderBackend: Send {
    fn headers(&mut self) -> Result<Vec<Packet>>;
    fn encode(&mut self, block: &PcmBlock) -> Result<Vec<Packet>>;
    fn flush(&mut self) -> Result<Vec<Packet>>;
    fn prepare_truncation(&mut self, total_frames: u64, last_block: bool);
    fn set_quality(&mut self, quality: f32) -> Result<()>;
    fn quality(&self) -> f32;
}

/// Object-safe decoder operations implemented by every backend.
pub(crate) trait DecoderBackend: Send {
    fn decode_packet(&mut self, data: &[u8]) -> Result<Option<PcmBlock>>;
}

impl EncoderBackend for VorbisEncoder {
    fn headers(&mut self) -> Result<Vec<Packet>> {
        VorbisEncoder::headers(self).map_err(Into::into)
    }

    fn encode(&mut self, block: &PcmBlock) -> Result<Vec<Packet>> {
        VorbisEncoder::encode(self, block).map_err(Into::into)
    }

    fn flush(&mut self) -> Result<Vec<Packet>> {
        VorbisEncoder::flush(self).map_err(Into::into)
    }

    fn prepare_truncation(&mut self, total_frames: u64, last_block: bool) {
        VorbisEncoder::prepare_truncation(self, total_frames, last_block);
    }

    fn set_quality(&mut self, quality: f32) -> Result<()> {
        VorbisEncoder::set_quality(self, quality).map_err(Into::into)
    }

    fn quality(&self) -> f32 {
        VorbisEncoder::quality(self)
    }
}

impl EncoderBackend for SpeexEncoder {
    fn headers(&mut self) -> Result<Vec<Packet>> {
        SpeexEncoder::headers(self).map_err(Into::into)
    }

    fn encode(&mut self, block: &PcmBlock) -> Result<Vec<Packet>> {
        SpeexEncoder::encode(self, block).map_err(Into::into)
    }

    fn flush(&mut self) -> Result<Vec<Packet>> {
        SpeexEncoder::flush(self).map_err(Into::into)
    }

    fn prepare_truncation(&mut self, total_frames: u64, last_block: bool) {
        SpeexEncoder::prepare_truncation(self, total_frames, last_block);
    }

    fn set_quality(&mut self, quality: f32) -> Result<()> {
        SpeexEncoder::set_quality(self, quality).map_err(Into::into)
    }

    fn quality(&self) -> f32 {
        SpeexEncoder::quality(self)
    }
}

impl DecoderBackend for VorbisDecoder {
    fn decode_packet(&mut self, data: &[u8]) -> Result<Option<PcmBlock>> {
        VorbisDecoder::decode_packet(self, data).map_err(Into::into)
    }
}

impl DecoderBackend for SpeexDecoder {
    fn decode_packet(&mut self, data: &[u8]) -> Result<Option<PcmBlock>> {
        SpeexDecoder::decode_packet(self, data).map_err(Into::into)
    }
}

/// Construct the encoder backend for a stream description.
pub(crate) fn new_encoder_backend(info: &SoundInfo) -> Result<Box<dyn EncoderBackend>> {
    match info.codec {
        SoundCodec::Vorbis => {
            let config = VorbisConfig::new(info.sample_rate, info.channels);
            Ok(Box::new(VorbisEncoder::new(config)?))
        }
        SoundCodec::Speex => {
            let config = SpeexConfig::new(info.sample_rate, info.channels);
            Ok(Box::new(SpeexEncoder::new(config)?))
        }
    }
}

/// Construct the decoder backend for a stream description.
pub(crate) fn new_decoder_backend(info: &SoundInfo) -> Result<Box<dyn DecoderBackend>> {
    match info.codec {
        SoundCodec::Vorbis => Ok(Box::new(VorbisDecoder::new())),
        SoundCodec::Speex => {
            // Channel limits surface at decode setup too, not just encode.
            SpeexConfig::new(info.sample_rate, info.channels).validate()?;
            Ok(Box::new(SpeexDecoder::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_names() {
        assert_eq!(SoundCodec::Vorbis.name(), "vorbis");
        assert_eq!(SoundCodec::Speex.name(), "speex");
        assert_eq!(SoundCodec::from_name("VORBIS"), Some(SoundCodec::Vorbis));
        assert_eq!(SoundCodec::from_name("opus"), None);
    }

    #[test]
    fn test_max_channels() {
        assert_eq!(SoundCodec::Vorbis.max_channels(), 32);
        assert_eq!(SoundCodec::Speex.max_channels(), 2);
    }

    #[test]
    fn test_backend_construction() {
        let ok = SoundInfo::new(48_000, 2, SoundCodec::Vorbis);
        assert!(new_encoder_backend(&ok).is_ok());

        let bad = SoundInfo::new(8_000, 6, SoundCodec::Speex);
        assert!(new_encoder_backend(&bad).is_err());
        assert!(new_decoder_backend(&bad).is_err());
    }
}
