//! Speex-class decoder implementation.

use byteorder::{ByteOrder, LittleEndian};
use soundpipe_core::PcmBlock;
use tracing::trace;

use crate::error::{Result, SpeexError};
use crate::{SpeexMode, MAGIC, PACKET_AUDIO, PACKET_COMMENT, PACKET_IDENT};

/// Stream parameters recovered from the identification header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeexInfo {
    /// Stream version.
    pub version: u32,
    /// Band mode.
    pub mode: SpeexMode,
    /// Number of channels.
    pub channels: u8,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Quantization depth in bits.
    pub quant_bits: u8,
}

/// Speex-class decoder.
#[derive(Debug, Default)]
pub struct SpeexDecoder {
    info: Option<SpeexInfo>,
    comment_seen: bool,
    granule_position: u64,
}

impl SpeexDecoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream parameters, available once the identification header is seen.
    pub fn info(&self) -> Option<&SpeexInfo> {
        self.info.as_ref()
    }

    /// Whether the header handshake has completed.
    pub fn headers_complete(&self) -> bool {
        self.info.is_some() && self.comment_seen
    }

    /// Current granule position (total frames decoded).
    pub fn granule_position(&self) -> u64 {
        self.granule_position
    }

    /// Decode one packet.
    ///
    /// Header packets return `None`; audio packets return the decoded block,
    /// trimmed to the frame count the encoder declared valid.
    pub fn decode_packet(&mut self, data: &[u8]) -> Result<Option<PcmBlock>> {
        let packet_type = *data
            .first()
            .ok_or_else(|| SpeexError::InvalidPacket("empty packet".into()))?;
        match packet_type {
            PACKET_IDENT => {
                self.parse_ident(&data[1..])?;
                Ok(None)
            }
            PACKET_COMMENT => {
                self.parse_comment(&data[1..])?;
                Ok(None)
            }
            PACKET_AUDIO => self.parse_audio(&data[1..]).map(Some),
            other => Err(SpeexError::InvalidPacket(format!(
                "unknown packet type {}",
                other
            ))),
        }
    }

    fn check_magic(data: &[u8]) -> Result<&[u8]> {
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(SpeexError::InvalidHeader("bad magic".into()));
        }
        Ok(&data[MAGIC.len()..])
    }

    fn parse_ident(&mut self, data: &[u8]) -> Result<()> {
        let body = Self::check_magic(data)?;
        if body.len() != 12 {
            return Err(SpeexError::InvalidHeader(format!(
                "ident header length {}",
                body.len()
            )));
        }
        let version = LittleEndian::read_u32(&body[0..4]);
        if version != 0 {
            return Err(SpeexError::InvalidHeader(format!(
                "unsupported version {}",
                version
            )));
        }
        let mode = SpeexMode::from_tag(body[4])
            .ok_or_else(|| SpeexError::InvalidHeader(format!("unknown mode {}", body[4])))?;
        let channels = body[5];
        if channels == 0 || channels > crate::MAX_CHANNELS {
            return Err(SpeexError::UnsupportedChannels(channels));
        }
        let sample_rate = LittleEndian::read_u32(&body[6..10]);
        let quant_bits = body[10];
        if quant_bits != 8 && quant_bits != 16 {
            return Err(SpeexError::InvalidHeader(format!(
                "unsupported quantization depth {}",
                quant_bits
            )));
        }
        if body[11] != 1 {
            return Err(SpeexError::InvalidHeader("bad framing".into()));
        }
        self.info = Some(SpeexInfo {
            version,
            mode,
            channels,
            sample_rate,
            quant_bits,
        });
        trace!(channels, sample_rate, mode = mode.name(), "ident header parsed");
        Ok(())
    }

    fn parse_comment(&mut self, data: &[u8]) -> Result<()> {
        if self.info.is_none() {
            return Err(SpeexError::InvalidHeader(
                "comment header before ident".into(),
            ));
        }
        let body = Self::check_magic(data)?;
        if body.len() < 5 {
            return Err(SpeexError::InvalidHeader("short comment header".into()));
        }
        let vendor_len = LittleEndian::read_u32(&body[0..4]) as usize;
        if body.len() != 4 + vendor_len + 1 || body[4 + vendor_len] != 1 {
            return Err(SpeexError::InvalidHeader("bad comment framing".into()));
        }
        self.comment_seen = true;
        Ok(())
    }

    fn parse_audio(&mut self, data: &[u8]) -> Result<PcmBlock> {
        if !self.headers_complete() {
            return Err(SpeexError::MissingHeaders);
        }
        let info = self.info.clone().ok_or(SpeexError::MissingHeaders)?;
        let channels = info.channels as usize;
        let frame_size = info.mode.frame_size();
        let bytes_per_sample = (info.quant_bits / 8) as usize;

        if data.len() < 2 {
            return Err(SpeexError::InvalidPacket("short audio packet".into()));
        }
        let valid_frames = LittleEndian::read_u16(&data[0..2]) as usize;
        if valid_frames > frame_size {
            return Err(SpeexError::InvalidPacket(format!(
                "duration {} exceeds codec frame {}",
                valid_frames, frame_size
            )));
        }
        let expected = 2 + frame_size * channels * bytes_per_sample;
        if data.len() != expected {
            return Err(SpeexError::InvalidPacket(format!(
                "audio packet length {} (expected {})",
                data.len(),
                expected
            )));
        }

        let mut planes = vec![Vec::with_capacity(valid_frames); channels];
        let body = &data[2..];
        for i in 0..valid_frames {
            for (ch, plane) in planes.iter_mut().enumerate() {
                let idx = i * channels + ch;
                let s = match info.quant_bits {
                    8 => ((body[idx] as i8 as i16) << 8) as f32 / i16::MAX as f32,
                    _ => {
                        let off = idx * 2;
                        LittleEndian::read_i16(&body[off..off + 2]) as f32 / i16::MAX as f32
                    }
                };
                plane.push(s);
            }
        }

        self.granule_position += valid_frames as u64;
        trace!(
            frames = valid_frames,
            granule = self.granule_position,
            "audio packet decoded"
        );
        PcmBlock::from_planes(planes).map_err(|e| SpeexError::InvalidData(e.to_string()))
    }
}
