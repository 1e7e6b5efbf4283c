//! Execution of a single encode/decode sweep case.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use soundpipe::{
    DecodeControl, DecodeOutcome, Decoder, Encoder, Interleave, PcmSample, SampleFormat,
    SoundCodec, SoundInfo,
};
use soundpipe_core::signal;
use tracing::debug;

/// Parameters of one sweep combination.
#[derive(Debug, Clone, Copy)]
pub struct CaseSpec {
    pub codec: SoundCodec,
    pub format: SampleFormat,
    pub sample_rate: u32,
    pub channels: u8,
    pub block_size: usize,
    pub interleave: Interleave,
    pub control: DecodeControl,
}

impl CaseSpec {
    /// Human-readable one-line case label.
    pub fn label(&self) -> String {
        format!(
            "+ {:2} channel {:6} Hz {:<6} {:4} frame {:<3} ({}) [{}]",
            self.channels,
            self.sample_rate,
            self.codec,
            self.block_size,
            self.format,
            self.interleave,
            self.control.code()
        )
    }
}

/// Outcome classification of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Warned,
    Failed,
}

/// Result record of one executed case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub label: String,
    pub status: CaseStatus,
    pub frames_in: u64,
    pub frames_out: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Routes encoded packets into the decoder, applying the stop-control
/// re-invocation policy with its byte accounting checks.
struct DecodeFeed {
    decoder: Decoder,
    expected: DecodeControl,
    violation: Option<String>,
}

impl DecodeFeed {
    fn feed(&mut self, wire: &[u8]) {
        if self.violation.is_some() {
            return;
        }
        match self.expected {
            DecodeControl::Continue => match self.decoder.decode(wire) {
                Ok(DecodeOutcome::Consumed(n)) if n == wire.len() => {}
                Ok(outcome) => {
                    self.violation = Some(format!(
                        "continue: consumed {} of {} bytes",
                        outcome.consumed(),
                        wire.len()
                    ));
                }
                Err(e) => self.violation = Some(format!("decode error: {}", e)),
            },
            expected => {
                // Re-invoke on the unconsumed remainder until the buffer
                // drains, accumulating the consumed-byte total.
                let mut consumed = 0usize;
                while consumed < wire.len() {
                    match self.decoder.decode(&wire[consumed..]) {
                        Ok(DecodeOutcome::Stopped {
                            control,
                            consumed: n,
                        }) => {
                            if control != expected {
                                self.violation =
                                    Some(format!("stop sweep: unexpected control {}", control));
                                return;
                            }
                            if n == 0 {
                                self.violation = Some("stop sweep: no progress".into());
                                return;
                            }
                            consumed += n;
                        }
                        Ok(DecodeOutcome::Consumed(n)) => {
                            consumed += n;
                            break;
                        }
                        Err(e) => {
                            self.violation = Some(format!("decode error: {}", e));
                            return;
                        }
                    }
                }
                let ok = match expected {
                    // A stop-ok sweep must account for every byte.
                    DecodeControl::StopOk => consumed == wire.len(),
                    _ => consumed <= wire.len(),
                };
                if !ok {
                    self.violation = Some(format!(
                        "stop sweep: consumed {} of {} bytes",
                        consumed,
                        wire.len()
                    ));
                }
            }
        }
    }
}

/// Classify a finished case.
///
/// A count mismatch fails only when the callback asked to continue and
/// frames went missing; any other mismatch is the codec padding envelope
/// and warns. Accounting violations always fail.
fn classify(
    control: DecodeControl,
    frames_in: u64,
    frames_out: u64,
    violation: &Option<String>,
) -> CaseStatus {
    if violation.is_some() {
        return CaseStatus::Failed;
    }
    if frames_in == frames_out {
        return CaseStatus::Passed;
    }
    if control == DecodeControl::Continue && frames_out < frames_in {
        CaseStatus::Failed
    } else {
        CaseStatus::Warned
    }
}

/// Run one case: build the pair, drive `iter` blocks, flush, compare counts.
pub fn run_case(spec: &CaseSpec, iter: u32, quality: f32) -> CaseResult {
    match drive(spec, iter, quality) {
        Ok((frames_in, frames_out, violation)) => {
            let status = classify(spec.control, frames_in, frames_out, &violation);
            let detail = violation.or_else(|| {
                (frames_in != frames_out).then(|| {
                    format!("{} frames encoded, {} frames decoded", frames_in, frames_out)
                })
            });
            CaseResult {
                label: spec.label(),
                status,
                frames_in,
                frames_out,
                detail,
            }
        }
        Err(e) => CaseResult {
            label: spec.label(),
            status: CaseStatus::Failed,
            frames_in: 0,
            frames_out: 0,
            detail: Some(e.to_string()),
        },
    }
}

fn drive(
    spec: &CaseSpec,
    iter: u32,
    quality: f32,
) -> soundpipe::Result<(u64, u64, Option<String>)> {
    let info = SoundInfo::new(spec.sample_rate, spec.channels, spec.codec);

    let mut encoder = Encoder::new(info)?;
    encoder.set_interleave(spec.interleave);
    encoder.set_quality(quality)?;
    if encoder.quality() != quality {
        return Ok((0, 0, Some("quality read-back mismatch".into())));
    }

    let mut decoder = Decoder::new(info)?;
    decoder.set_interleave(spec.interleave);
    let expected = spec.control;
    let format = spec.format;
    decoder.on_decoded(move |audio| {
        // Pull the audio through the case's typed representation.
        if audio.interleave().is_interleaved() {
            match format {
                SampleFormat::S16 => drop(audio.pcm_interleaved::<i16>()),
                SampleFormat::S32 => drop(audio.pcm_interleaved::<i32>()),
                SampleFormat::F32 => drop(audio.pcm_interleaved::<f32>()),
                SampleFormat::F64 => drop(audio.pcm_interleaved::<f64>()),
            }
        } else {
            match format {
                SampleFormat::S16 => drop(audio.pcm_planar::<i16>()),
                SampleFormat::S32 => drop(audio.pcm_planar::<i32>()),
                SampleFormat::F32 => drop(audio.pcm_planar::<f32>()),
                SampleFormat::F64 => drop(audio.pcm_planar::<f64>()),
            }
        }
        expected
    });

    let feed = Rc::new(RefCell::new(DecodeFeed {
        decoder,
        expected: spec.control,
        violation: None,
    }));
    let sink_feed = Rc::clone(&feed);
    encoder.on_packet(move |packet| sink_feed.borrow_mut().feed(&packet.to_wire()));

    let frames_in = match spec.format {
        SampleFormat::S16 => drive_loop(&mut encoder, spec, iter, signal::SQUARE_AMPLITUDE_I16)?,
        SampleFormat::S32 => drive_loop(&mut encoder, spec, iter, signal::SQUARE_AMPLITUDE_I32)?,
        SampleFormat::F32 => drive_loop(&mut encoder, spec, iter, signal::SQUARE_AMPLITUDE_F32)?,
        SampleFormat::F64 => drive_loop(&mut encoder, spec, iter, signal::SQUARE_AMPLITUDE_F64)?,
    };

    let feed = feed.borrow();
    let frames_out = feed.decoder.frames_out();
    debug!(frames_in, frames_out, "case driven");
    Ok((frames_in, frames_out, feed.violation.clone()))
}

/// Feed `iter` square-wave blocks through the encoder and flush.
fn drive_loop<S>(
    encoder: &mut Encoder,
    spec: &CaseSpec,
    iter: u32,
    amplitude: S,
) -> soundpipe::Result<u64>
where
    S: PcmSample + Default + Copy + std::ops::Neg<Output = S>,
{
    let channels = spec.channels as usize;
    let interleaved = signal::square_interleaved(amplitude, channels, spec.block_size);
    let planes = signal::square_planar(amplitude, channels, spec.block_size);

    let mut frames_in = 0u64;
    for i in 0..iter {
        frames_in += spec.block_size as u64;
        encoder.prepare_truncation(frames_in, i == iter - 1);
        match spec.interleave {
            Interleave::Interleaved => {
                encoder.encode_interleaved(&interleaved)?;
            }
            Interleave::Planar => {
                let refs: Vec<&[S]> = planes.iter().map(|p| p.as_slice()).collect();
                encoder.encode_planar(&refs)?;
            }
        }
    }
    encoder.flush()?;
    Ok(frames_in)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(codec: SoundCodec, control: DecodeControl) -> CaseSpec {
        CaseSpec {
            codec,
            format: SampleFormat::S16,
            sample_rate: 8_000,
            channels: 1,
            block_size: 128,
            interleave: Interleave::Interleaved,
            control,
        }
    }

    #[test]
    fn test_classify_rules() {
        let none = None;
        let boom = Some("boom".to_string());
        assert_eq!(
            classify(DecodeControl::Continue, 256, 256, &none),
            CaseStatus::Passed
        );
        // Missing frames under continue is a failure.
        assert_eq!(
            classify(DecodeControl::Continue, 256, 200, &none),
            CaseStatus::Failed
        );
        // Overshoot is the padding envelope.
        assert_eq!(
            classify(DecodeControl::Continue, 256, 320, &none),
            CaseStatus::Warned
        );
        // Early stop may legitimately leave frames undecoded.
        assert_eq!(
            classify(DecodeControl::StopOk, 256, 200, &none),
            CaseStatus::Warned
        );
        assert_eq!(
            classify(DecodeControl::Continue, 256, 256, &boom),
            CaseStatus::Failed
        );
    }

    #[test]
    fn test_continue_case_passes() {
        let result = run_case(&spec(SoundCodec::Vorbis, DecodeControl::Continue), 2, 0.1);
        assert_eq!(result.status, CaseStatus::Passed, "{:?}", result.detail);
        assert_eq!(result.frames_in, 256);
        assert_eq!(result.frames_in, result.frames_out);
    }

    #[test]
    fn test_stop_sweeps_pass_for_speech_codec() {
        for control in [DecodeControl::StopOk, DecodeControl::StopErr] {
            let result = run_case(&spec(SoundCodec::Speex, control), 2, 0.1);
            assert_ne!(result.status, CaseStatus::Failed, "{:?}", result.detail);
        }
    }

    #[test]
    fn test_planar_case_passes() {
        let mut s = spec(SoundCodec::Vorbis, DecodeControl::Continue);
        s.interleave = Interleave::Planar;
        s.format = SampleFormat::F64;
        let result = run_case(&s, 2, 0.1);
        assert_eq!(result.status, CaseStatus::Passed, "{:?}", result.detail);
    }

    #[test]
    fn test_bad_quality_fails_case() {
        let result = run_case(&spec(SoundCodec::Vorbis, DecodeControl::Continue), 2, 1.5);
        assert_eq!(result.status, CaseStatus::Failed);
    }

    #[test]
    fn test_label_shape() {
        let label = spec(SoundCodec::Speex, DecodeControl::StopOk).label();
        assert!(label.contains("speex"));
        assert!(label.contains("8000 Hz"));
        assert!(label.contains("[O]"));
        assert!(label.contains("interleaved"));
    }
}
