//! Speex-class encoder implementation.

use byteorder::{ByteOrder, LittleEndian};
use soundpipe_core::{Packet, PcmBlock};
use tracing::debug;

use crate::error::{Result, SpeexError};
use crate::{SpeexMode, MAGIC, MAX_CHANNELS, PACKET_AUDIO, PACKET_COMMENT, PACKET_IDENT};

/// Vendor string written into the comment header.
const VENDOR: &str = "soundpipe-speex 0.1.0";

/// Encoder configuration.
#[derive(Debug, Clone)]
pub struct SpeexConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 or 2).
    pub channels: u8,
    /// Quality level (0.0 to 1.0).
    pub quality: f32,
}

impl SpeexConfig {
    /// Create a new configuration with default quality.
    pub fn new(sample_rate: u32, channels: u8) -> Self {
        Self {
            sample_rate,
            channels,
            quality: 0.4,
        }
    }

    /// Set the quality level (0.0 to 1.0).
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    /// The band mode implied by the sample rate.
    pub fn mode(&self) -> SpeexMode {
        SpeexMode::from_sample_rate(self.sample_rate)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SpeexError::ConfigError("zero sample rate".into()));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(SpeexError::UnsupportedChannels(self.channels));
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(SpeexError::ConfigError(format!(
                "quality {} out of range 0.0..=1.0",
                self.quality
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
pub struct SpeexEncoderStats {
    /// Total packets emitted (headers included).
    pub packets_encoded: u64,
    /// Total payload bytes emitted.
    pub bytes_encoded: u64,
    /// Total frames emitted in audio packets.
    pub frames_encoded: u64,
}

/// Speex-class encoder.
///
/// Gathers interleaved samples into whole codec frames. [`flush`] zero-pads
/// the final partial frame; when the stream length was declared via
/// [`prepare_truncation`], only the declared frames count toward the packet
/// duration and the padding is invisible to the decoder.
///
/// [`flush`]: SpeexEncoder::flush
/// [`prepare_truncation`]: SpeexEncoder::prepare_truncation
#[derive(Debug)]
pub struct SpeexEncoder {
    config: SpeexConfig,
    mode: SpeexMode,
    /// Buffered interleaved i16 samples.
    pending: Vec<i16>,
    headers_emitted: bool,
    granule_position: u64,
    truncate_target: Option<u64>,
    stats: SpeexEncoderStats,
}

impl SpeexEncoder {
    /// Create a new encoder.
    pub fn new(config: SpeexConfig) -> Result<Self> {
        config.validate()?;
        let mode = config.mode();
        Ok(Self {
            config,
            mode,
            pending: Vec::new(),
            headers_emitted: false,
            granule_position: 0,
            truncate_target: None,
            stats: SpeexEncoderStats::default(),
        })
    }

    /// Get the encoder configuration.
    pub fn config(&self) -> &SpeexConfig {
        &self.config
    }

    /// The band mode in use.
    pub fn mode(&self) -> SpeexMode {
        self.mode
    }

    /// Get encoder statistics.
    pub fn stats(&self) -> &SpeexEncoderStats {
        &self.stats
    }

    /// Change the quality level before any packet has been produced.
    pub fn set_quality(&mut self, quality: f32) -> Result<()> {
        if self.headers_emitted {
            return Err(SpeexError::ConfigError(
                "quality cannot change after headers are emitted".into(),
            ));
        }
        if !(0.0..=1.0).contains(&quality) {
            return Err(SpeexError::ConfigError(format!(
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

    /// Get the header packets (ident, comment).
    ///
    /// Emitted once; later calls return an empty vector.
    pub fn headers(&mut self) -> Result<Vec<Packet>> {
        if self.headers_emitted {
            return Ok(Vec::new());
        }
        let headers = vec![self.create_ident_header(), self.create_comment_header()];
        self.headers_emitted = true;
        for h in &headers {
            self.stats.packets_encoded += 1;
            self.stats.bytes_encoded += h.data.len() as u64;
        }
        Ok(headers)
    }

    fn create_ident_header(&self) -> Packet {
        let mut data = Vec::with_capacity(19);
        data.push(PACKET_IDENT);
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(self.mode.tag());
        data.push(self.config.channels);
        data.extend_from_slice(&self.config.sample_rate.to_le_bytes());
        data.push(self.config.quant_bits());
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

    /// Declare the total stream length in frames.
    pub fn prepare_truncation(&mut self, total_frames: u64, last_block: bool) {
        self.truncate_target = Some(total_frames);
        if last_block {
            debug!(total_frames, "final stream length declared");
        }
    }

    /// Encode one block of planar audio, returning zero or more packets.
    pub fn encode(&mut self, block: &PcmBlock) -> Result<Vec<Packet>> {
        let channels = self.config.channels as usize;
        if block.channels() != channels {
            return Err(SpeexError::InvalidData(format!(
                "expected {} channels, got {}",
                channels,
                block.channels()
            )));
        }

        for i in 0..block.frames() {
            for ch in 0..channels {
                // Channel count was checked above.
                let s = block.plane(ch).map(|p| p[i]).unwrap_or(0.0);
                self.pending
                    .push((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
            }
        }

        let frame_samples = self.mode.frame_size() * channels;
        let mut packets = Vec::new();
        while self.pending.len() >= frame_samples {
            if let Some(packet) = self.emit_frame(false) {
                packets.push(packet);
            }
        }
        Ok(packets)
    }

    /// Flush buffered input, zero-padding the final partial frame.
    pub fn flush(&mut self) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();
        if !self.pending.is_empty() {
            if let Some(packet) = self.emit_frame(true) {
                packets.push(packet);
            }
        }
        self.pending.clear();
        debug!(
            packets = packets.len(),
            granule = self.granule_position,
            "encoder flushed"
        );
        Ok(packets)
    }

    /// Emit one codec frame from the pending buffer.
    ///
    /// When `pad` is set the buffer may hold less than a whole frame; the
    /// remainder is zero-filled. The packet duration covers the valid frames
    /// only when a truncation target makes the valid count knowable,
    /// otherwise the whole (padded) frame counts.
    fn emit_frame(&mut self, pad: bool) -> Option<Packet> {
        let channels = self.config.channels as usize;
        let frame_size = self.mode.frame_size();
        let frame_samples = frame_size * channels;

        let available = self.pending.len() / channels;
        let take = if pad {
            available.min(frame_size)
        } else {
            frame_size
        };

        let mut samples: Vec<i16> = self.pending.drain(..take * channels).collect();
        samples.resize(frame_samples, 0);

        let buffered_frames = take;
        let valid_frames = match self.truncate_target {
            Some(target) => {
                let remaining = target.saturating_sub(self.granule_position) as usize;
                if pad {
                    buffered_frames.min(remaining)
                } else {
                    frame_size.min(remaining)
                }
            }
            // Without a declared length the decoder sees the padded frame.
            None => frame_size,
        };
        if valid_frames == 0 {
            return None;
        }

        let quant_bits = self.config.quant_bits();
        let mut data = Vec::with_capacity(3 + frame_samples * (quant_bits / 8) as usize);
        data.push(PACKET_AUDIO);
        let mut buf2 = [0u8; 2];
        LittleEndian::write_u16(&mut buf2, valid_frames as u16);
        data.extend_from_slice(&buf2);

        match quant_bits {
            8 => {
                for &s in &samples {
                    data.push(((s >> 8) as i8) as u8);
                }
            }
            _ => {
                for &s in &samples {
                    LittleEndian::write_i16(&mut buf2, s);
                    data.extend_from_slice(&buf2);
                }
            }
        }

        self.granule_position += valid_frames as u64;
        self.stats.packets_encoded += 1;
        self.stats.bytes_encoded += data.len() as u64;
        self.stats.frames_encoded += valid_frames as u64;

        Some(Packet::audio(
            data,
            self.granule_position,
            valid_frames as u32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(channels: usize, frames: usize) -> PcmBlock {
        let mut b = PcmBlock::new(channels, frames);
        for ch in 0..channels {
            let plane = b.plane_mut(ch).unwrap();
            for (i, s) in plane.iter_mut().enumerate() {
                *s = if (i / 50) % 2 == 0 { 0.4 } else { -0.4 };
            }
        }
        b
    }

    #[test]
    fn test_config_validation() {
        assert!(SpeexConfig::new(8_000, 1).validate().is_ok());
        assert!(SpeexConfig::new(8_000, 2).validate().is_ok());
        assert!(SpeexConfig::new(8_000, 3).validate().is_err());
        assert!(SpeexConfig::new(0, 1).validate().is_err());
        assert!(SpeexConfig::new(8_000, 1).with_quality(-0.1).validate().is_err());
    }

    #[test]
    fn test_headers_emitted_once() {
        let mut enc = SpeexEncoder::new(SpeexConfig::new(8_000, 1)).unwrap();
        let headers = enc.headers().unwrap();
        assert_eq!(headers.len(), 2);
        assert!(enc.headers().unwrap().is_empty());
    }

    #[test]
    fn test_whole_frames_emitted() {
        let mut enc = SpeexEncoder::new(SpeexConfig::new(8_000, 2)).unwrap();
        // 400 frames at narrowband (160): two whole frames, 80 pending.
        let packets = enc.encode(&tone(2, 400)).unwrap();
        assert_eq!(packets.len(), 2);
        assert!(packets.iter().all(|p| p.duration == 160));
        assert_eq!(enc.stats().frames_encoded, 320);
    }

    #[test]
    fn test_flush_pads_without_truncation() {
        let mut enc = SpeexEncoder::new(SpeexConfig::new(8_000, 1)).unwrap();
        enc.encode(&tone(1, 100)).unwrap();
        let tail = enc.flush().unwrap();
        assert_eq!(tail.len(), 1);
        // Padded to a whole codec frame.
        assert_eq!(tail[0].duration, 160);
        assert_eq!(enc.stats().frames_encoded, 160);
    }

    #[test]
    fn test_flush_exact_with_truncation() {
        let mut enc = SpeexEncoder::new(SpeexConfig::new(8_000, 1)).unwrap();
        enc.encode(&tone(1, 100)).unwrap();
        enc.prepare_truncation(100, true);
        let tail = enc.flush().unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].duration, 100);
        assert_eq!(enc.stats().frames_encoded, 100);
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let mut enc = SpeexEncoder::new(SpeexConfig::new(8_000, 1)).unwrap();
        assert!(enc.encode(&tone(2, 64)).is_err());
    }
}
