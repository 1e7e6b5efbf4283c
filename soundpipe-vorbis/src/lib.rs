//! Vorbis-class general audio backend for the soundpipe library.
//!
//! This crate provides the general-purpose audio codec used by the unified
//! soundpipe layer: a block-based, quality-controlled quantizing codec with
//! Vorbis-style stream framing (three header packets followed by data
//! packets carrying granule positions).
//!
//! The payload coding is deliberately simple; the stream-level behavior the
//! rest of the system depends on is faithful: header handshake, per-packet
//! frame durations, granule accounting and end-of-stream truncation.
//!
//! ## Example
//!
//! ```no_run
//! use soundpipe_vorbis::{VorbisConfig, VorbisDecoder, VorbisEncoder};
//!
//! let config = VorbisConfig::new(48_000, 2).with_quality(0.4);
//! let encoder = VorbisEncoder::new(config)?;
//! let decoder = VorbisDecoder::new();
//! # let _ = (encoder, decoder);
//! # Ok::<(), soundpipe_vorbis::VorbisError>(())
//! ```

#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;

pub use decoder::{VorbisDecoder, VorbisInfo};
pub use encoder::{VorbisConfig, VorbisEncoder, VorbisEncoderStats};
pub use error::{Result, VorbisError};

/// Codec name.
pub const CODEC_NAME: &str = "vorbis";

/// Codec long name.
pub const CODEC_LONG_NAME: &str = "Soundpipe Vorbis-class general audio";

/// Minimum supported sample rate.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Maximum supported sample rate.
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Maximum number of channels.
pub const MAX_CHANNELS: u8 = 32;

/// Stream magic carried by every header packet.
pub(crate) const MAGIC: &[u8; 6] = b"spvorb";

/// Header packet types.
pub(crate) const PACKET_IDENT: u8 = 1;
pub(crate) const PACKET_COMMENT: u8 = 3;
pub(crate) const PACKET_SETUP: u8 = 5;
/// Audio packet type.
pub(crate) const PACKET_AUDIO: u8 = 0;
