//! Unified encoder.

use soundpipe_core::{ChannelLayout, Error, Interleave, Packet, PcmBlock, PcmSample, Result};
use tracing::debug;

use crate::codec::{new_encoder_backend, EncoderBackend, SoundInfo};

type PacketSink = Box<dyn FnMut(&Packet)>;

/// Callback-driven audio encoder.
///
/// Accepts typed PCM through the generic entry points and hands every
/// produced packet (headers first, then data) to the registered packet sink.
/// The channel ordering of the input buffers must match the configured
/// [`Interleave`] mode.
pub struct Encoder {
    info: SoundInfo,
    interleave: Interleave,
    backend: Box<dyn EncoderBackend>,
    sink: Option<PacketSink>,
    frames_in: u64,
}

impl Encoder {
    /// Create an encoder for the given stream description.
    pub fn new(info: SoundInfo) -> Result<Self> {
        let backend = new_encoder_backend(&info)?;
        debug!(
            codec = %info.codec,
            sample_rate = info.sample_rate,
            layout = %ChannelLayout::from_channels(info.channels as u32),
            "encoder created"
        );
        Ok(Self {
            info,
            interleave: Interleave::default(),
            backend,
            sink: None,
            frames_in: 0,
        })
    }

    /// The stream description.
    pub fn info(&self) -> &SoundInfo {
        &self.info
    }

    /// Set the channel ordering the typed entry points expect.
    pub fn set_interleave(&mut self, interleave: Interleave) {
        self.interleave = interleave;
    }

    /// The configured channel ordering.
    pub fn interleave(&self) -> Interleave {
        self.interleave
    }

    /// Set the encode quality (0.0 to 1.0). Only valid before the first
    /// packet is produced.
    pub fn set_quality(&mut self, quality: f32) -> Result<()> {
        self.backend.set_quality(quality)
    }

    /// The quality previously set (or the codec default).
    pub fn quality(&self) -> f32 {
        self.backend.quality()
    }

    /// Total frames accepted so far.
    pub fn frames_in(&self) -> u64 {
        self.frames_in
    }

    /// Register the packet sink invoked for every produced packet.
    pub fn on_packet<F>(&mut self, sink: F)
    where
        F: FnMut(&Packet) + 'static,
    {
        self.sink = Some(Box::new(sink));
    }

    /// Declare the total stream length in frames, trimming codec padding
    /// from the tail. `last_block` marks the final input block.
    pub fn prepare_truncation(&mut self, total_frames: u64, last_block: bool) {
        self.backend.prepare_truncation(total_frames, last_block);
    }

    /// Encode one interleaved buffer; returns the frames accepted.
    pub fn encode_interleaved<S: PcmSample>(&mut self, pcm: &[S]) -> Result<usize> {
        if !self.interleave.is_interleaved() {
            return Err(Error::buffer_mismatch(
                "encoder is configured for non-interleaved input",
            ));
        }
        let block = PcmBlock::from_interleaved(pcm, self.info.channels as usize)?;
        self.encode_block(block)
    }

    /// Encode one block of per-channel buffers; returns the frames accepted.
    pub fn encode_planar<S: PcmSample>(&mut self, pcm: &[&[S]]) -> Result<usize> {
        if self.interleave.is_interleaved() {
            return Err(Error::buffer_mismatch(
                "encoder is configured for interleaved input",
            ));
        }
        if pcm.len() != self.info.channels as usize {
            return Err(Error::buffer_mismatch(format!(
                "expected {} channel planes, got {}",
                self.info.channels,
                pcm.len()
            )));
        }
        let block = PcmBlock::from_planar(pcm)?;
        self.encode_block(block)
    }

    fn encode_block(&mut self, block: PcmBlock) -> Result<usize> {
        let frames = block.frames();
        let headers = self.backend.headers()?;
        self.deliver(&headers);
        let packets = self.backend.encode(&block)?;
        self.deliver(&packets);
        self.frames_in += frames as u64;
        Ok(frames)
    }

    /// Flush buffered audio out of the codec, delivering the tail packets.
    pub fn flush(&mut self) -> Result<()> {
        let headers = self.backend.headers()?;
        self.deliver(&headers);
        let packets = self.backend.flush()?;
        self.deliver(&packets);
        debug!(frames_in = self.frames_in, "encoder flushed");
        Ok(())
    }

    fn deliver(&mut self, packets: &[Packet]) {
        if let Some(sink) = self.sink.as_mut() {
            for packet in packets {
                sink(packet);
            }
        }
    }
}
