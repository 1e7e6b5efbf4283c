//! Unified decoder with callback-driven delivery and stop control.

use byteorder::{ByteOrder, LittleEndian};
use soundpipe_core::{DecodeControl, Interleave, PcmBlock, PcmSample, Result};
use tracing::{debug, trace};

use crate::codec::{new_decoder_backend, DecoderBackend, SoundInfo};

/// Result of one [`Decoder::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// All complete packets in the input were processed; `0..n` bytes were
    /// consumed (a trailing partial packet is left for the next call).
    Consumed(usize),
    /// The decoded-audio callback requested a stop. Only the bytes of fully
    /// processed packets were consumed; decoding resumes from there.
    Stopped {
        /// The stop code the callback returned.
        control: DecodeControl,
        /// Bytes consumed before stopping.
        consumed: usize,
    },
}

impl DecodeOutcome {
    /// Bytes consumed by the call.
    pub fn consumed(&self) -> usize {
        match self {
            Self::Consumed(n) => *n,
            Self::Stopped { consumed, .. } => *consumed,
        }
    }

    /// Whether the callback stopped the call early.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped { .. })
    }
}

/// Borrowed view of one decoded block handed to the decoded-audio callback.
pub struct DecodedAudio<'a> {
    block: &'a PcmBlock,
    interleave: Interleave,
}

impl DecodedAudio<'_> {
    /// Frames in this block.
    pub fn frames(&self) -> usize {
        self.block.frames()
    }

    /// Channels in this block.
    pub fn channels(&self) -> usize {
        self.block.channels()
    }

    /// The channel ordering the decoder is configured for.
    pub fn interleave(&self) -> Interleave {
        self.interleave
    }

    /// Export the block as one interleaved typed buffer.
    pub fn pcm_interleaved<S: PcmSample>(&self) -> Vec<S> {
        self.block.to_interleaved()
    }

    /// Export the block as per-channel typed buffers.
    pub fn pcm_planar<S: PcmSample>(&self) -> Vec<Vec<S>> {
        self.block.to_planar()
    }
}

type DecodedCallback = Box<dyn FnMut(&DecodedAudio<'_>) -> DecodeControl>;

/// Callback-driven audio decoder.
///
/// Input is a byte stream of length-prefixed packets (see
/// [`Packet::to_wire`]). Every decoded block is handed to the registered
/// callback, whose return value steers the call: a stop code terminates
/// decoding at the current packet boundary and the outcome reports the bytes
/// consumed so far, so the caller can re-invoke with the remainder and
/// accumulate.
///
/// [`Packet::to_wire`]: soundpipe_core::Packet::to_wire
pub struct Decoder {
    info: SoundInfo,
    interleave: Interleave,
    backend: Box<dyn DecoderBackend>,
    callback: Option<DecodedCallback>,
    frames_out: u64,
}

impl Decoder {
    /// Create a decoder for the given stream description.
    pub fn new(info: SoundInfo) -> Result<Self> {
        let backend = new_decoder_backend(&info)?;
        Ok(Self {
            info,
            interleave: Interleave::default(),
            backend,
            callback: None,
            frames_out: 0,
        })
    }

    /// The stream description.
    pub fn info(&self) -> &SoundInfo {
        &self.info
    }

    /// Set the channel ordering reported to the callback.
    pub fn set_interleave(&mut self, interleave: Interleave) {
        self.interleave = interleave;
    }

    /// The configured channel ordering.
    pub fn interleave(&self) -> Interleave {
        self.interleave
    }

    /// Total frames decoded so far.
    pub fn frames_out(&self) -> u64 {
        self.frames_out
    }

    /// Register the decoded-audio callback.
    pub fn on_decoded<F>(&mut self, callback: F)
    where
        F: FnMut(&DecodedAudio<'_>) -> DecodeControl + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Decode a byte stream of length-prefixed packets.
    ///
    /// Returns how much of `data` was consumed and whether the callback
    /// stopped the call early. A trailing partial packet is never consumed;
    /// feed the unconsumed remainder again once more bytes are available.
    pub fn decode(&mut self, data: &[u8]) -> Result<DecodeOutcome> {
        let mut consumed = 0usize;

        while data.len() - consumed >= 4 {
            let payload_len = LittleEndian::read_u32(&data[consumed..consumed + 4]) as usize;
            let total = 4 + payload_len;
            if data.len() - consumed < total {
                break;
            }
            let payload = &data[consumed + 4..consumed + total];

            let block = self.backend.decode_packet(payload)?;
            consumed += total;

            if let Some(block) = block {
                self.frames_out += block.frames() as u64;
                trace!(
                    frames = block.frames(),
                    frames_out = self.frames_out,
                    "block decoded"
                );
                if let Some(callback) = self.callback.as_mut() {
                    let view = DecodedAudio {
                        block: &block,
                        interleave: self.interleave,
                    };
                    let control = callback(&view);
                    if control.is_stop() {
                        debug!(consumed, control = %control, "decode stopped by callback");
                        return Ok(DecodeOutcome::Stopped { control, consumed });
                    }
                }
            }
        }

        Ok(DecodeOutcome::Consumed(consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SoundCodec;
    use crate::encoder::Encoder;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn encode_stream(info: SoundInfo, frames: usize) -> Vec<u8> {
        let mut enc = Encoder::new(info).unwrap();
        let wire: Rc<RefCell<Vec<u8>>> = Rc::default();
        let sink_wire = Rc::clone(&wire);
        enc.on_packet(move |p| sink_wire.borrow_mut().extend_from_slice(&p.to_wire()));

        let pcm = vec![0i16; frames * info.channels as usize];
        enc.encode_interleaved(&pcm).unwrap();
        enc.prepare_truncation(frames as u64, true);
        enc.flush().unwrap();
        wire.take()
    }

    #[test]
    fn test_whole_stream_consumed() {
        let info = SoundInfo::new(48_000, 2, SoundCodec::Vorbis);
        let stream = encode_stream(info, 2048);

        let mut dec = Decoder::new(info).unwrap();
        let outcome = dec.decode(&stream).unwrap();
        assert_eq!(outcome, DecodeOutcome::Consumed(stream.len()));
        assert_eq!(dec.frames_out(), 2048);
    }

    #[test]
    fn test_partial_packet_left_unconsumed() {
        let info = SoundInfo::new(48_000, 1, SoundCodec::Vorbis);
        let stream = encode_stream(info, 1500);

        let mut dec = Decoder::new(info).unwrap();
        let mid = stream.len() / 2;
        let first = dec.decode(&stream[..mid]).unwrap();
        let n1 = first.consumed();
        assert!(n1 <= mid);

        let second = dec.decode(&stream[n1..]).unwrap();
        assert_eq!(n1 + second.consumed(), stream.len());
        assert_eq!(dec.frames_out(), 1500);
    }

    #[test]
    fn test_stop_reports_packet_boundary() {
        let info = SoundInfo::new(48_000, 1, SoundCodec::Vorbis);
        let stream = encode_stream(info, 4096);

        let mut dec = Decoder::new(info).unwrap();
        dec.on_decoded(|_| DecodeControl::StopOk);

        let mut consumed = 0;
        let mut stops = 0;
        while consumed < stream.len() {
            match dec.decode(&stream[consumed..]).unwrap() {
                DecodeOutcome::Stopped { control, consumed: n } => {
                    assert_eq!(control, DecodeControl::StopOk);
                    assert!(n > 0);
                    consumed += n;
                    stops += 1;
                }
                DecodeOutcome::Consumed(n) => {
                    consumed += n;
                    break;
                }
            }
        }
        assert_eq!(consumed, stream.len());
        assert!(stops >= 2);
        assert_eq!(dec.frames_out(), 4096);
    }

    #[test]
    fn test_callback_receives_configured_ordering() {
        let info = SoundInfo::new(48_000, 2, SoundCodec::Vorbis);
        let stream = encode_stream(info, 1024);

        let mut dec = Decoder::new(info).unwrap();
        dec.set_interleave(Interleave::Planar);
        let seen: Rc<RefCell<Vec<(usize, usize)>>> = Rc::default();
        let cb_seen = Rc::clone(&seen);
        dec.on_decoded(move |audio| {
            assert_eq!(audio.interleave(), Interleave::Planar);
            let planes: Vec<Vec<f32>> = audio.pcm_planar();
            cb_seen.borrow_mut().push((planes.len(), audio.frames()));
            DecodeControl::Continue
        });
        dec.decode(&stream).unwrap();

        let seen = seen.borrow();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&(ch, _)| ch == 2));
        assert_eq!(seen.iter().map(|&(_, f)| f).sum::<usize>(), 1024);
    }
}
