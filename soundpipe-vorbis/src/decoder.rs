//! Vorbis-class decoder implementation.

use byteorder::{ByteOrder, LittleEndian};
use soundpipe_core::PcmBlock;
use tracing::trace;

use crate::error::{Result, VorbisError};
use crate::{MAGIC, PACKET_AUDIO, PACKET_COMMENT, PACKET_IDENT, PACKET_SETUP};

/// Stream parameters recovered from the identification header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VorbisInfo {
    /// Stream version.
    pub version: u32,
    /// Number of channels.
    pub channels: u8,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Block size in frames.
    pub block_size: u16,
}

/// Vorbis-class decoder.
///
/// Consumes packets in stream order: the three header packets, then data
/// packets. Each data packet yields one [`PcmBlock`] whose length is the
/// frame count the encoder declared for it, so truncated tails decode short.
#[derive(Debug, Default)]
pub struct VorbisDecoder {
    info: Option<VorbisInfo>,
    comment_seen: bool,
    setup_seen: bool,
    quant_bits: u8,
    granule_position: u64,
}

impl VorbisDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream parameters, available once the identification header is seen.
    pub fn info(&self) -> Option<&VorbisInfo> {
        self.info.as_ref()
    }

    /// Whether the full header handshake has completed.
    pub fn headers_complete(&self) -> bool {
        self.info.is_some() && self.comment_seen && self.setup_seen
    }

    /// Current granule position (total frames decoded).
    pub fn granule_position(&self) -> u64 {
        self.granule_position
    }

    /// Decode one packet.
    ///
    /// Header packets return `None`; data packets return the decoded block.
    pub fn decode_packet(&mut self, data: &[u8]) -> Result<Option<PcmBlock>> {
        let packet_type = *data
            .first()
            .ok_or_else(|| VorbisError::InvalidPacket("empty packet".into()))?;
        match packet_type {
            PACKET_IDENT => {
                self.parse_ident(&data[1..])?;
                Ok(None)
            }
            PACKET_COMMENT => {
                self.parse_comment(&data[1..])?;
                Ok(None)
            }
            PACKET_SETUP => {
                self.parse_setup(&data[1..])?;
                Ok(None)
            }
            PACKET_AUDIO => self.parse_audio(&data[1..]).map(Some),
            other => Err(VorbisError::InvalidPacket(format!(
                "unknown packet type {}",
                other
            ))),
        }
    }

    fn check_magic(data: &[u8]) -> Result<&[u8]> {
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(VorbisError::InvalidHeader("bad magic".into()));
        }
        Ok(&data[MAGIC.len()..])
    }

    fn parse_ident(&mut self, data: &[u8]) -> Result<()> {
        let body = Self::check_magic(data)?;
        if body.len() != 11 {
            return Err(VorbisError::InvalidHeader(format!(
                "ident header length {}",
                body.len()
            )));
        }
        let version = LittleEndian::read_u32(&body[0..4]);
        if version != 0 {
            return Err(VorbisError::InvalidHeader(format!(
                "unsupported version {}",
                version
            )));
        }
        let channels = body[4];
        if channels == 0 {
            return Err(VorbisError::InvalidHeader("zero channels".into()));
        }
        let sample_rate = LittleEndian::read_u32(&body[5..9]);
        let block_exp = body[9];
        if block_exp > 13 || body[10] != 1 {
            return Err(VorbisError::InvalidHeader("bad framing".into()));
        }
        self.info = Some(VorbisInfo {
            version,
            channels,
            sample_rate,
            block_size: 1u16 << block_exp,
        });
        trace!(channels, sample_rate, "ident header parsed");
        Ok(())
    }

    fn parse_comment(&mut self, data: &[u8]) -> Result<()> {
        if self.info.is_none() {
            return Err(VorbisError::InvalidHeader(
                "comment header before ident".into(),
            ));
        }
        let body = Self::check_magic(data)?;
        if body.len() < 5 {
            return Err(VorbisError::InvalidHeader("short comment header".into()));
        }
        let vendor_len = LittleEndian::read_u32(&body[0..4]) as usize;
        if body.len() != 4 + vendor_len + 1 || body[4 + vendor_len] != 1 {
            return Err(VorbisError::InvalidHeader("bad comment framing".into()));
        }
        self.comment_seen = true;
        Ok(())
    }

    fn parse_setup(&mut self, data: &[u8]) -> Result<()> {
        if self.info.is_none() {
            return Err(VorbisError::InvalidHeader("setup header before ident".into()));
        }
        let body = Self::check_magic(data)?;
        if body.len() != 2 || body[1] != 1 {
            return Err(VorbisError::InvalidHeader("bad setup framing".into()));
        }
        let quant_bits = body[0];
        if quant_bits != 8 && quant_bits != 16 {
            return Err(VorbisError::InvalidHeader(format!(
                "unsupported quantization depth {}",
                quant_bits
            )));
        }
        self.quant_bits = quant_bits;
        self.setup_seen = true;
        Ok(())
    }

    fn parse_audio(&mut self, data: &[u8]) -> Result<PcmBlock> {
        if !self.headers_complete() {
            return Err(VorbisError::MissingHeaders);
        }
        let channels = self
            .info
            .as_ref()
            .ok_or(VorbisError::MissingHeaders)?
            .channels as usize;

        if data.len() < 2 {
            return Err(VorbisError::InvalidPacket("short audio packet".into()));
        }
        let frames = LittleEndian::read_u16(&data[0..2]) as usize;
        let bytes_per_sample = (self.quant_bits / 8) as usize;
        let expected = 2 + channels * (4 + frames * bytes_per_sample);
        if data.len() != expected {
            return Err(VorbisError::InvalidPacket(format!(
                "audio packet length {} (expected {})",
                data.len(),
                expected
            )));
        }

        let mut planes = Vec::with_capacity(channels);
        let mut offset = 2;
        for _ in 0..channels {
            let scale = LittleEndian::read_f32(&data[offset..offset + 4]);
            offset += 4;
            let mut plane = Vec::with_capacity(frames);
            match self.quant_bits {
                8 => {
                    for _ in 0..frames {
                        let q = data[offset] as i8;
                        offset += 1;
                        plane.push(q as f32 / i8::MAX as f32 * scale);
                    }
                }
                _ => {
                    for _ in 0..frames {
                        let q = LittleEndian::read_i16(&data[offset..offset + 2]);
                        offset += 2;
                        plane.push(q as f32 / i16::MAX as f32 * scale);
                    }
                }
            }
            planes.push(plane);
        }

        self.granule_position += frames as u64;
        trace!(frames, granule = self.granule_position, "audio packet decoded");
        PcmBlock::from_planes(planes)
            .map_err(|e| VorbisError::InvalidData(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{VorbisConfig, VorbisEncoder};
    use soundpipe_core::PcmBlock;

    fn ramp_block(channels: usize, frames: usize) -> PcmBlock {
        let mut b = PcmBlock::new(channels, frames);
        for ch in 0..channels {
            let plane = b.plane_mut(ch).unwrap();
            for (i, s) in plane.iter_mut().enumerate() {
                *s = ((i % 64) as f32 / 64.0) - 0.5;
            }
        }
        b
    }

    fn pipe(enc: &mut VorbisEncoder, dec: &mut VorbisDecoder, frames: usize) -> usize {
        let channels = enc.config().channels as usize;
        let mut decoded = 0;
        let mut packets = enc.headers().unwrap();
        packets.extend(enc.encode(&ramp_block(channels, frames)).unwrap());
        packets.extend(enc.flush().unwrap());
        for p in packets {
            if let Some(block) = dec.decode_packet(&p.data).unwrap() {
                decoded += block.frames();
            }
        }
        decoded
    }

    #[test]
    fn test_header_handshake() {
        let mut enc = VorbisEncoder::new(VorbisConfig::new(44_100, 4)).unwrap();
        let mut dec = VorbisDecoder::new();
        for h in enc.headers().unwrap() {
            assert!(dec.decode_packet(&h.data).unwrap().is_none());
        }
        assert!(dec.headers_complete());
        let info = dec.info().unwrap();
        assert_eq!(info.channels, 4);
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.block_size, 1024);
    }

    #[test]
    fn test_audio_before_headers_rejected() {
        let mut dec = VorbisDecoder::new();
        let err = dec.decode_packet(&[PACKET_AUDIO, 0, 0]).unwrap_err();
        assert!(matches!(err, VorbisError::MissingHeaders));
    }

    #[test]
    fn test_roundtrip_frame_counts() {
        let config = VorbisConfig::new(48_000, 2).with_block_size(256);
        let mut enc = VorbisEncoder::new(config).unwrap();
        let mut dec = VorbisDecoder::new();
        let decoded = pipe(&mut enc, &mut dec, 600);
        assert_eq!(decoded, 600);
        assert_eq!(dec.granule_position(), 600);
    }

    #[test]
    fn test_roundtrip_values_within_quantization() {
        let config = VorbisConfig::new(48_000, 1)
            .with_block_size(64)
            .with_quality(0.9);
        let mut enc = VorbisEncoder::new(config).unwrap();
        let mut dec = VorbisDecoder::new();

        let input = ramp_block(1, 64);
        let mut packets = enc.headers().unwrap();
        packets.extend(enc.encode(&input).unwrap());
        for p in packets {
            if let Some(block) = dec.decode_packet(&p.data).unwrap() {
                let orig = input.plane(0).unwrap();
                let out = block.plane(0).unwrap();
                for (a, b) in orig.iter().zip(out.iter()) {
                    assert!((a - b).abs() < 1e-3, "sample drifted: {} vs {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_truncated_tail_decodes_short() {
        let config = VorbisConfig::new(48_000, 2).with_block_size(256);
        let mut enc = VorbisEncoder::new(config).unwrap();
        let mut dec = VorbisDecoder::new();

        let mut packets = enc.headers().unwrap();
        packets.extend(enc.encode(&ramp_block(2, 300)).unwrap());
        enc.prepare_truncation(280, true);
        packets.extend(enc.flush().unwrap());

        let mut decoded = 0;
        for p in packets {
            if let Some(block) = dec.decode_packet(&p.data).unwrap() {
                decoded += block.frames();
            }
        }
        assert_eq!(decoded, 280);
    }

    #[test]
    fn test_garbage_rejected() {
        let mut dec = VorbisDecoder::new();
        assert!(dec.decode_packet(&[]).is_err());
        assert!(dec.decode_packet(&[9, 1, 2]).is_err());
        assert!(dec.decode_packet(&[PACKET_IDENT, b'x', b'x']).is_err());
    }
}
