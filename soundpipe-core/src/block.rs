//! PCM block storage and typed sample conversion.
//!
//! Codec backends operate on planar `f32` audio. [`PcmBlock`] holds one block
//! of such audio and converts from and to the four user-facing sample
//! representations in either channel ordering.

use crate::error::{Error, Result};
use crate::sample::SampleFormat;

/// Conversion between a user-facing sample representation and normalized f32.
///
/// Implemented for the four supported representations: `i16`, `i32`, `f32`
/// and `f64`. Integer formats are normalized to the −1.0..1.0 range.
pub trait PcmSample: Copy {
    /// The format tag for this sample type.
    const FORMAT: SampleFormat;

    /// Convert to a normalized f32 sample.
    fn to_f32(self) -> f32;

    /// Convert from a normalized f32 sample.
    fn from_f32(v: f32) -> Self;
}

impl PcmSample for i16 {
    const FORMAT: SampleFormat = SampleFormat::S16;

    fn to_f32(self) -> f32 {
        self as f32 / 32768.0
    }

    fn from_f32(v: f32) -> Self {
        (v.clamp(-1.0, 1.0) * 32767.0) as i16
    }
}

impl PcmSample for i32 {
    const FORMAT: SampleFormat = SampleFormat::S32;

    fn to_f32(self) -> f32 {
        self as f32 / 2147483648.0
    }

    fn from_f32(v: f32) -> Self {
        (v.clamp(-1.0, 1.0) * 2147483647.0) as i32
    }
}

impl PcmSample for f32 {
    const FORMAT: SampleFormat = SampleFormat::F32;

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(v: f32) -> Self {
        v
    }
}

impl PcmSample for f64 {
    const FORMAT: SampleFormat = SampleFormat::F64;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(v: f32) -> Self {
        v as f64
    }
}

/// One block of planar audio: one `f32` plane per channel, equal lengths.
#[derive(Debug, Clone)]
pub struct PcmBlock {
    planes: Vec<Vec<f32>>,
    frames: usize,
}

impl PcmBlock {
    /// Create a silent block with the given shape.
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            planes: vec![vec![0.0; frames]; channels],
            frames,
        }
    }

    /// Build a block directly from planar f32 planes.
    ///
    /// All planes must have the same length and there must be at least one.
    pub fn from_planes(planes: Vec<Vec<f32>>) -> Result<Self> {
        let frames = planes
            .first()
            .map(|p| p.len())
            .ok_or_else(|| Error::buffer_mismatch("no channel planes"))?;
        if planes.iter().any(|p| p.len() != frames) {
            return Err(Error::buffer_mismatch("channel planes differ in length"));
        }
        Ok(Self { planes, frames })
    }

    /// Build a block from an interleaved typed buffer.
    ///
    /// The buffer length must be a multiple of the channel count.
    pub fn from_interleaved<S: PcmSample>(pcm: &[S], channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(Error::invalid_param("channel count must be nonzero"));
        }
        if pcm.len() % channels != 0 {
            return Err(Error::buffer_mismatch(format!(
                "interleaved length {} not divisible by {} channels",
                pcm.len(),
                channels
            )));
        }
        let frames = pcm.len() / channels;
        let mut planes = vec![Vec::with_capacity(frames); channels];
        for frame in pcm.chunks_exact(channels) {
            for (ch, s) in frame.iter().enumerate() {
                planes[ch].push(s.to_f32());
            }
        }
        Ok(Self { planes, frames })
    }

    /// Build a block from per-channel typed buffers.
    pub fn from_planar<S: PcmSample>(pcm: &[&[S]]) -> Result<Self> {
        let frames = pcm
            .first()
            .map(|p| p.len())
            .ok_or_else(|| Error::buffer_mismatch("no channel planes"))?;
        if pcm.iter().any(|p| p.len() != frames) {
            return Err(Error::buffer_mismatch("channel planes differ in length"));
        }
        let planes = pcm
            .iter()
            .map(|p| p.iter().map(|s| s.to_f32()).collect())
            .collect();
        Ok(Self { planes, frames })
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// Number of frames per channel.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Borrow one channel plane.
    pub fn plane(&self, channel: usize) -> Option<&[f32]> {
        self.planes.get(channel).map(|p| p.as_slice())
    }

    /// Mutably borrow one channel plane.
    pub fn plane_mut(&mut self, channel: usize) -> Option<&mut [f32]> {
        self.planes.get_mut(channel).map(|p| p.as_mut_slice())
    }

    /// Truncate the block to at most `frames` frames per channel.
    pub fn truncate(&mut self, frames: usize) {
        if frames < self.frames {
            for plane in &mut self.planes {
                plane.truncate(frames);
            }
            self.frames = frames;
        }
    }

    /// Export as an interleaved typed buffer.
    pub fn to_interleaved<S: PcmSample>(&self) -> Vec<S> {
        let mut out = Vec::with_capacity(self.frames * self.planes.len());
        for i in 0..self.frames {
            for plane in &self.planes {
                out.push(S::from_f32(plane[i]));
            }
        }
        out
    }

    /// Export as per-channel typed buffers.
    pub fn to_planar<S: PcmSample>(&self) -> Vec<Vec<S>> {
        self.planes
            .iter()
            .map(|p| p.iter().map(|&s| S::from_f32(s)).collect())
            .collect()
    }
}
