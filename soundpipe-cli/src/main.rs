//! soundpipe-encdec - encode/decode sweep harness for the soundpipe codecs.
//!
//! Sweeps block sizes, sample rates, channel counts, the four PCM
//! representations, both channel orderings and the decode stop-control
//! behaviors, driving every combination through an encoder/decoder pair and
//! checking frame and byte accounting.

mod case;

use std::time::Instant;

use anyhow::bail;
use case::{CaseResult, CaseSpec, CaseStatus};
use clap::Parser;
use console::style;
use serde::Serialize;
use soundpipe::{DecodeControl, Interleave, SampleFormat, SoundCodec};
use tracing::info;

const DEFAULT_BLOCK_SIZES: &[usize] = &[128, 1024];
const DEFAULT_SAMPLE_RATES: &[u32] = &[8_000, 48_000];
const DEFAULT_CHANNELS: &[u8] = &[1, 2, 6, 16];

const NASTY_BLOCK_SIZES: &[usize] = &[128, 256, 512, 1024, 2048, 4096];
const NASTY_SAMPLE_RATES: &[u32] = &[8_000, 16_000, 32_000, 48_000];
const NASTY_CHANNELS: &[u8] = &[1, 2, 4, 5, 6, 8, 10, 16, 32];

/// Command-line arguments for the sweep harness.
#[derive(Parser, Debug)]
#[command(name = "soundpipe-encdec")]
#[command(version)]
#[command(about = "Encode/decode pipeline sweep for the soundpipe codecs")]
struct Args {
    /// Iterations per test
    #[arg(long, default_value = "2")]
    iter: u32,

    /// Run with large test parameters
    #[arg(long)]
    nasty: bool,

    /// Disable testing of the Vorbis-class codec
    #[arg(long)]
    disable_vorbis: bool,

    /// Disable testing of the Speex-class codec
    #[arg(long)]
    disable_speex: bool,

    /// Disable testing of interleaved buffers
    #[arg(long)]
    disable_interleave: bool,

    /// Disable testing of non-interleaved buffers
    #[arg(long)]
    disable_non_interleave: bool,

    /// Encode quality applied to every case (0.0 to 1.0)
    #[arg(long, default_value = "0.1")]
    quality: f32,

    /// JSON summary output for programmatic parsing
    #[arg(long, conflicts_with = "verbose")]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Sweep summary emitted at the end of the run.
#[derive(Debug, Serialize)]
struct Summary {
    cases: usize,
    passed: usize,
    warned: usize,
    failed: usize,
    elapsed_seconds: f64,
}

/// Expand the argument selection into the ordered case list.
fn build_cases(args: &Args) -> Vec<CaseSpec> {
    let (block_sizes, sample_rates, channel_counts) = if args.nasty {
        (NASTY_BLOCK_SIZES, NASTY_SAMPLE_RATES, NASTY_CHANNELS)
    } else {
        (DEFAULT_BLOCK_SIZES, DEFAULT_SAMPLE_RATES, DEFAULT_CHANNELS)
    };

    let mut orderings = Vec::new();
    if !args.disable_non_interleave {
        orderings.push(Interleave::Planar);
    }
    if !args.disable_interleave {
        orderings.push(Interleave::Interleaved);
    }

    let mut cases = Vec::new();
    for &block_size in block_sizes {
        for &sample_rate in sample_rates {
            for &channels in channel_counts {
                for &format in SampleFormat::all() {
                    for &interleave in &orderings {
                        if !args.disable_vorbis {
                            cases.push(CaseSpec {
                                codec: SoundCodec::Vorbis,
                                format,
                                sample_rate,
                                channels,
                                block_size,
                                interleave,
                                control: DecodeControl::Continue,
                            });
                        }
                        if !args.disable_speex && channels <= SoundCodec::Speex.max_channels() {
                            for control in [
                                DecodeControl::Continue,
                                DecodeControl::StopOk,
                                DecodeControl::StopErr,
                            ] {
                                cases.push(CaseSpec {
                                    codec: SoundCodec::Speex,
                                    format,
                                    sample_rate,
                                    channels,
                                    block_size,
                                    interleave,
                                    control,
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    cases
}

fn print_result(result: &CaseResult) {
    let tag = match result.status {
        CaseStatus::Passed => style("ok").green(),
        CaseStatus::Warned => style("warn").yellow(),
        CaseStatus::Failed => style("FAIL").red().bold(),
    };
    println!("{} {}", result.label, tag);
    if let Some(detail) = &result.detail {
        println!("    {}", style(detail).dim());
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !args.json {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(if args.verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            })
            .with_target(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    if !(0.0..=1.0).contains(&args.quality) {
        bail!("quality must be within 0.0..=1.0");
    }
    if args.iter == 0 {
        bail!("iterations must be nonzero");
    }

    info!("Testing encode/decode pipeline for audio");

    // Report abnormal options.
    if args.nasty {
        info!("* Running NASTY large test parameters");
    }
    if args.disable_vorbis {
        info!("* DISABLED testing of the Vorbis-class codec");
    }
    if args.disable_speex {
        info!("* DISABLED testing of the Speex-class codec");
    }
    if args.disable_interleave {
        info!("* DISABLED testing of INTERLEAVED buffers");
    }
    if args.disable_non_interleave {
        info!("* DISABLED testing of NON-INTERLEAVED buffers");
    }

    let cases = build_cases(&args);
    let start = Instant::now();
    let mut results = Vec::with_capacity(cases.len());

    for spec in &cases {
        let result = case::run_case(spec, args.iter, args.quality);
        if !args.json {
            print_result(&result);
        }
        results.push(result);
    }

    let summary = Summary {
        cases: results.len(),
        passed: results.iter().filter(|r| r.status == CaseStatus::Passed).count(),
        warned: results.iter().filter(|r| r.status == CaseStatus::Warned).count(),
        failed: results.iter().filter(|r| r.status == CaseStatus::Failed).count(),
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!();
        println!("{}", style("Sweep complete:").cyan().bold());
        println!("  Cases:    {}", summary.cases);
        println!("  Passed:   {}", style(summary.passed).green());
        if summary.warned > 0 {
            println!("  Warned:   {}", style(summary.warned).yellow());
        }
        if summary.failed > 0 {
            println!("  Failed:   {}", style(summary.failed).red());
        }
        println!("  Time:     {:.1}s", summary.elapsed_seconds);
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
