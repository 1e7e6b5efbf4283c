//! Vorbis-class encoder implementation.

use byteorder::{ByteOrder, LittleEndian};
use soundpipe_core::{Packet, PcmBlock};
use tracing::debug;

use crate::error::{Result, VorbisError};
use crate::{MAGIC, MAX_CHANNELS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use crate::{PACKET_AUDIO, PACKET_COMMENT, PACKET_IDENT, PACKET_SETUP};

/// Vendor string written into the comment header.
const VENDOR: &str = "soundpipe-vorbis 0.1.0";

/// Encoder configuration.
#[derive(Debug, Clone)]
pub struct VorbisConfig {
    /// Sample rate (8000-192000).
    pub sample_rate: u32,
    /// Number of channels (1-32).
    pub channels: u8,
    /// Quality level (0.0 to 1.0).
    pub quality: f32,
    /// Block size in frames (power of 2, 64-8192).
    pub block_size: u16,
}

impl VorbisConfig {
    /// Create a new configuration with default quality and block size.
    pub fn new(sample_rate: u32, channels: u8) -> Self {
        Self {
            sample_rate,
            channels,
            quality: 0.4,
            block_size: 1024,
        }
    }

    /// Set the quality level (0.0 to 1.0).
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    /// Set the block size in frames.
    pub fn with_block_size(mut self, block_size: u16) -> Self {
        self.block_size = block_size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < MIN_SAMPLE_RATE || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(VorbisError::UnsupportedSampleRate(self.sample_rate));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(VorbisError::UnsupportedChannels(self.channels));
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(VorbisError::ConfigError(format!(
                "quality {} out of range 0.0..=1.0",
                self.quality
            )));
        }
        if !self.block_size.is_power_of_two() || !(64..=8192).contains(&self.block_size) {
            return Err(VorbisError::ConfigError(format!(
                "invalid block size {}",
                self.block_size
            )));
        }
        Ok(())
    }

    /// Quantization depth in bits derived from the quality level.
    pub fn quant_bits(&self) -> u8 {
        if self.quality < 0.5 {
            8
        } else {
            16
        }
    }
}

/// Encoder statistics.
#[derive(Debug, Clone, Default)]
pub struct VorbisEncoderStats {
    /// Total packets emitted (headers included).
    pub packets_encoded: u64,
    /// Total payload bytes emitted.
    pub bytes_encoded: u64,
    /// Total frames emitted in data packets.
    pub frames_encoded: u64,
}

/// Vorbis-class encoder.
///
/// Buffers planar audio and emits one data packet per full block; [`flush`]
/// drains the remainder as a short final packet, honoring any truncation
/// target declared via [`prepare_truncation`].
///
/// [`flush`]: VorbisEncoder::flush
/// [`prepare_truncation`]: VorbisEncoder::prepare_truncation
#[derive(Debug)]
pub struct VorbisEncoder {
    config: VorbisConfig,
    /// Buffered input, one plane per channel.
    pending: Vec<Vec<f32>>,
    headers_emitted: bool,
    granule_position: u64,
    /// Total stream length in frames, once declared.
    truncate_target: Option<u64>,
    stats: VorbisEncoderStats,
}

impl VorbisEncoder {
    /// Create a new encoder.
    pub fn new(config: VorbisConfig) -> Result<Self> {
        config.validate()?;
        let pending = vec![Vec::new(); config.channels as usize];
        Ok(Self {
            config,
            pending,
            headers_emitted: false,
            granule_position: 0,
            truncate_target: None,
            stats: VorbisEncoderStats::default(),
        })
    }

    /// Get the encoder configuration.
    pub fn config(&self) -> &VorbisConfig {
        &self.config
    }

    /// Get encoder statistics.
    pub fn stats(&self) -> &VorbisEncoderStats {
        &self.stats
    }

    /// Change the quality level before any packet has been produced.
    pub fn set_quality(&mut self, quality: f32) -> Result<()> {
        if self.headers_emitted {
            return Err(VorbisError::ConfigError(
                "quality cannot change after headers are emitted".into(),
            ));
        }
        if !(0.0..=1.0).contains(&quality) {
            return Err(VorbisError::ConfigError(format!(
                "quality {} out of range 0.0..=1.0",
                quality
            )));
        }
        self.config.quality = quality;
        Ok(())
    }

    /// Current quality level.
    pub fn quality(&self) -> f32 {
        self.config.quality
    }

    /// Get the header packets (ident, comment, setup).
    ///
    /// Emitted once; later calls return an empty vector.
    pub fn headers(&mut self) -> Result<Vec<Packet>> {
        if self.headers_emitted {
            return Ok(Vec::new());
        }
        let headers = vec![
            self.create_ident_header(),
            self.create_comment_header(),
            self.create_setup_header(),
        ];
        self.headers_emitted = true;
        for h in &headers {
            self.stats.packets_encoded += 1;
            self.stats.bytes_encoded += h.data.len() as u64;
        }
        Ok(headers)
    }

    fn create_ident_header(&self) -> Packet {
        let mut data = Vec::with_capacity(18);
        data.push(PACKET_IDENT);
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(self.config.channels);
        data.extend_from_slice(&self.config.sample_rate.to_le_bytes());
        data.push(self.config.block_size.trailing_zeros() as u8);
        // Framing bit
        data.push(1);
        Packet::header(data)
    }

    fn create_comment_header(&self) -> Packet {
        let vendor = VENDOR.as_bytes();
        let mut data = Vec::with_capacity(1 + MAGIC.len() + 4 + vendor.len() + 1);
        data.push(PACKET_COMMENT);
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        data.extend_from_slice(vendor);
        data.push(1);
        Packet::header(data)
    }

    fn create_setup_header(&self) -> Packet {
        let mut data = Vec::with_capacity(1 + MAGIC.len() + 2);
        data.push(PACKET_SETUP);
        data.extend_from_slice(MAGIC);
        data.push(self.config.quant_bits());
        data.push(1);
        Packet::header(data)
    }

    /// Declare the total stream length in frames.
    ///
    /// Frames beyond the target are trimmed from the tail of the stream.
    /// `last_block` marks that no further input follows the current buffer.
    pub fn prepare_truncation(&mut self, total_frames: u64, last_block: bool) {
        self.truncate_target = Some(total_frames);
        if last_block {
            debug!(total_frames, "final stream length declared");
        }
    }

    /// Encode one block of planar audio, returning zero or more data packets.
    pub fn encode(&mut self, block: &PcmBlock) -> Result<Vec<Packet>> {
        if block.channels() != self.config.channels as usize {
            return Err(VorbisError::InvalidData(format!(
                "expected {} channels, got {}",
                self.config.channels,
                block.channels()
            )));
        }

        for (ch, pending) in self.pending.iter_mut().enumerate() {
            // Channel count was checked above.
            if let Some(plane) = block.plane(ch) {
                pending.extend_from_slice(plane);
            }
        }

        let mut packets = Vec::new();
        let block_size = self.config.block_size as usize;
        while self.pending[0].len() >= block_size {
            if let Some(packet) = self.emit_block(block_size) {
                packets.push(packet);
            }
        }
        Ok(packets)
    }

    /// Flush buffered input as a final short packet and reset the buffer.
    pub fn flush(&mut self) -> Result<Vec<Packet>> {
        let remaining = self.pending[0].len();
        let mut packets = Vec::new();
        if remaining > 0 {
            if let Some(packet) = self.emit_block(remaining) {
                packets.push(packet);
            }
        }
        for pending in &mut self.pending {
            pending.clear();
        }
        debug!(
            packets = packets.len(),
            granule = self.granule_position,
            "encoder flushed"
        );
        Ok(packets)
    }

    /// Emit the first `frames` buffered frames as one data packet.
    ///
    /// Returns `None` when the truncation target leaves nothing to emit.
    fn emit_block(&mut self, frames: usize) -> Option<Packet> {
        let emit_frames = match self.truncate_target {
            Some(target) => {
                let remaining = target.saturating_sub(self.granule_position) as usize;
                frames.min(remaining)
            }
            None => frames,
        };

        // Drain the full request even when the tail is trimmed away.
        let drained: Vec<Vec<f32>> = self
            .pending
            .iter_mut()
            .map(|p| p.drain(..frames).collect())
            .collect();

        if emit_frames == 0 {
            return None;
        }

        let quant_bits = self.config.quant_bits();
        let bytes_per_sample = (quant_bits / 8) as usize;
        let channels = self.config.channels as usize;
        let mut data =
            Vec::with_capacity(3 + channels * (4 + emit_frames * bytes_per_sample));
        data.push(PACKET_AUDIO);
        let mut buf2 = [0u8; 2];
        LittleEndian::write_u16(&mut buf2, emit_frames as u16);
        data.extend_from_slice(&buf2);

        for plane in &drained {
            let samples = &plane[..emit_frames];
            let scale = samples
                .iter()
                .fold(0.0f32, |acc, s| acc.max(s.abs()))
                .max(f32::MIN_POSITIVE);
            let mut buf4 = [0u8; 4];
            LittleEndian::write_f32(&mut buf4, scale);
            data.extend_from_slice(&buf4);

            match quant_bits {
                8 => {
                    for &s in samples {
                        let q = (s / scale * i8::MAX as f32).round() as i8;
                        data.push(q as u8);
                    }
                }
                _ => {
                    for &s in samples {
                        let q = (s / scale * i16::MAX as f32).round() as i16;
                        LittleEndian::write_i16(&mut buf2, q);
                        data.extend_from_slice(&buf2);
                    }
                }
            }
        }

        self.granule_position += emit_frames as u64;
        self.stats.packets_encoded += 1;
        self.stats.bytes_encoded += data.len() as u64;
        self.stats.frames_encoded += emit_frames as u64;

        Some(Packet::audio(
            data,
            self.granule_position,
            emit_frames as u32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(channels: usize, frames: usize) -> PcmBlock {
        let mut b = PcmBlock::new(channels, frames);
        for ch in 0..channels {
            let plane = b.plane_mut(ch).unwrap();
            for (i, s) in plane.iter_mut().enumerate() {
                *s = if i % 2 == 0 { 0.5 } else { -0.5 };
            }
        }
        b
    }

    #[test]
    fn test_config_validation() {
        assert!(VorbisConfig::new(48_000, 2).validate().is_ok());
        assert!(VorbisConfig::new(4_000, 2).validate().is_err());
        assert!(VorbisConfig::new(48_000, 0).validate().is_err());
        assert!(VorbisConfig::new(48_000, 33).validate().is_err());
        assert!(VorbisConfig::new(48_000, 2)
            .with_quality(1.5)
            .validate()
            .is_err());
        assert!(VorbisConfig::new(48_000, 2)
            .with_block_size(100)
            .validate()
            .is_err());
    }

    #[test]
    fn test_quant_bits_from_quality() {
        assert_eq!(VorbisConfig::new(48_000, 2).with_quality(0.1).quant_bits(), 8);
        assert_eq!(VorbisConfig::new(48_000, 2).with_quality(0.9).quant_bits(), 16);
    }

    #[test]
    fn test_headers_emitted_once() {
        let mut enc = VorbisEncoder::new(VorbisConfig::new(48_000, 2)).unwrap();
        let headers = enc.headers().unwrap();
        assert_eq!(headers.len(), 3);
        assert!(headers.iter().all(|h| h.is_header));
        assert!(enc.headers().unwrap().is_empty());
    }

    #[test]
    fn test_quality_frozen_after_headers() {
        let mut enc = VorbisEncoder::new(VorbisConfig::new(48_000, 2)).unwrap();
        enc.set_quality(0.1).unwrap();
        assert_eq!(enc.quality(), 0.1);
        enc.headers().unwrap();
        assert!(enc.set_quality(0.9).is_err());
    }

    #[test]
    fn test_block_boundary_emission() {
        let config = VorbisConfig::new(48_000, 2).with_block_size(256);
        let mut enc = VorbisEncoder::new(config).unwrap();
        enc.headers().unwrap();

        // 200 frames: below one block, nothing emitted yet.
        assert!(enc.encode(&block(2, 200)).unwrap().is_empty());
        // 200 more: one full block emitted, 144 left pending.
        let packets = enc.encode(&block(2, 200)).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].duration, 256);
        assert_eq!(packets[0].granule_position, 256);

        let tail = enc.flush().unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].duration, 144);
        assert_eq!(enc.stats().frames_encoded, 400);
    }

    #[test]
    fn test_truncation_trims_tail() {
        let config = VorbisConfig::new(48_000, 1).with_block_size(256);
        let mut enc = VorbisEncoder::new(config).unwrap();
        enc.headers().unwrap();

        enc.encode(&block(1, 300)).unwrap();
        enc.prepare_truncation(280, true);
        let tail = enc.flush().unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].duration, 24);
        assert_eq!(enc.stats().frames_encoded, 280);
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let mut enc = VorbisEncoder::new(VorbisConfig::new(48_000, 2)).unwrap();
        assert!(enc.encode(&block(3, 64)).is_err());
    }
}
