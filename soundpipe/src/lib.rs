//! # Soundpipe
//!
//! Unified callback-driven audio encoding and decoding over two codec
//! backends: a Vorbis-class general audio codec and a Speex-class speech
//! codec.
//!
//! ## Features
//!
//! - **Typed PCM entry points**: encode from `i16`, `i32`, `f32` or `f64`
//!   buffers, interleaved or one-buffer-per-channel
//! - **Callback decode**: decoded audio is delivered to a registered
//!   callback which can stop decoding early (stop control)
//! - **Byte-exact resumption**: a stopped decode reports how much input was
//!   consumed so the caller can resume at the next packet boundary
//! - **Truncation**: declare the total stream length so codec framing
//!   padding is trimmed on flush
//!
//! ## Example
//!
//! ```no_run
//! use soundpipe::{DecodeControl, Decoder, Encoder, SoundCodec, SoundInfo};
//!
//! # fn main() -> soundpipe::Result<()> {
//! let info = SoundInfo::new(48_000, 2, SoundCodec::Vorbis);
//! let mut encoder = Encoder::new(info)?;
//! let mut decoder = Decoder::new(info)?;
//!
//! decoder.on_decoded(|audio| {
//!     let _pcm: Vec<i16> = audio.pcm_interleaved();
//!     DecodeControl::Continue
//! });
//!
//! let pcm = vec![0i16; 2 * 1024];
//! encoder.on_packet(move |packet| {
//!     // feed packet.to_wire() into the decoder byte stream
//!     let _ = packet.len();
//! });
//! encoder.encode_interleaved(&pcm)?;
//! encoder.flush()?;
//! # Ok(())
//! # }
//! ```

mod codec;
mod decoder;
mod encoder;

pub use codec::{SoundCodec, SoundInfo};
pub use decoder::{DecodeOutcome, DecodedAudio, Decoder};
pub use encoder::Encoder;

pub use soundpipe_core::{
    DecodeControl, Error, Interleave, Packet, PcmSample, Result, SampleFormat,
};
