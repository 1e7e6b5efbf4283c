//! Speex-class speech backend for the soundpipe library.
//!
//! A fixed-frame speech codec: input is gathered into whole codec frames
//! (160, 320 or 640 samples depending on the band mode chosen from the
//! sample rate), mono or stereo only. The final partial frame is zero-padded
//! at flush, so decoded totals can overshoot the input by up to one codec
//! frame unless the stream length was declared up front.

#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;

pub use decoder::{SpeexDecoder, SpeexInfo};
pub use encoder::{SpeexConfig, SpeexEncoder, SpeexEncoderStats};
pub use error::{Result, SpeexError};

/// Codec name.
pub const CODEC_NAME: &str = "speex";

/// Codec long name.
pub const CODEC_LONG_NAME: &str = "Soundpipe Speex-class speech";

/// Maximum number of channels.
pub const MAX_CHANNELS: u8 = 2;

/// Stream magic carried by header packets.
pub(crate) const MAGIC: &[u8; 6] = b"spspex";

/// Header packet types.
pub(crate) const PACKET_IDENT: u8 = 1;
pub(crate) const PACKET_COMMENT: u8 = 3;
/// Audio packet type.
pub(crate) const PACKET_AUDIO: u8 = 0;

/// Band mode, selected from the sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeexMode {
    /// Narrowband: 160-sample frames.
    NarrowBand,
    /// Wideband: 320-sample frames.
    WideBand,
    /// Ultra-wideband: 640-sample frames.
    UltraWideBand,
}

impl SpeexMode {
    /// Codec frame size in samples per channel.
    pub const fn frame_size(&self) -> usize {
        match self {
            Self::NarrowBand => 160,
            Self::WideBand => 320,
            Self::UltraWideBand => 640,
        }
    }

    /// Choose the band mode for a sample rate.
    pub const fn from_sample_rate(sample_rate: u32) -> Self {
        if sample_rate <= 12_500 {
            Self::NarrowBand
        } else if sample_rate <= 25_000 {
            Self::WideBand
        } else {
            Self::UltraWideBand
        }
    }

    /// Wire tag for the identification header.
    pub(crate) const fn tag(&self) -> u8 {
        match self {
            Self::NarrowBand => 0,
            Self::WideBand => 1,
            Self::UltraWideBand => 2,
        }
    }

    /// Decode a wire tag.
    pub(crate) const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::NarrowBand),
            1 => Some(Self::WideBand),
            2 => Some(Self::UltraWideBand),
            _ => None,
        }
    }

    /// Band mode name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NarrowBand => "narrowband",
            Self::WideBand => "wideband",
            Self::UltraWideBand => "ultra-wideband",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_sample_rate() {
        assert_eq!(SpeexMode::from_sample_rate(8_000), SpeexMode::NarrowBand);
        assert_eq!(SpeexMode::from_sample_rate(16_000), SpeexMode::WideBand);
        assert_eq!(SpeexMode::from_sample_rate(32_000), SpeexMode::UltraWideBand);
        assert_eq!(SpeexMode::from_sample_rate(48_000), SpeexMode::UltraWideBand);
    }

    #[test]
    fn test_frame_sizes() {
        assert_eq!(SpeexMode::NarrowBand.frame_size(), 160);
        assert_eq!(SpeexMode::WideBand.frame_size(), 320);
        assert_eq!(SpeexMode::UltraWideBand.frame_size(), 640);
    }

    #[test]
    fn test_mode_tags() {
        for mode in [
            SpeexMode::NarrowBand,
            SpeexMode::WideBand,
            SpeexMode::UltraWideBand,
        ] {
            assert_eq!(SpeexMode::from_tag(mode.tag()), Some(mode));
        }
        assert_eq!(SpeexMode::from_tag(7), None);
    }
}
