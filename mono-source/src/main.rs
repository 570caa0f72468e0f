//! mono-source - Main entry point
//!
//! Reads an audio file block by block through [`SourceReader`] and prints a
//! summary of the mono signal it delivers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mono_source::{ResampleQuality, SourceConfig, SourceOptions, SourceReader};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for mono-source
#[derive(Parser, Debug)]
#[command(name = "mono-source")]
#[command(about = "Read an audio file as fixed-size mono blocks at a chosen sample rate")]
#[command(version)]
struct Args {
    /// Audio file to read
    file: PathBuf,

    /// Output sample rate in Hz (0 = file's native rate)
    #[arg(short, long)]
    samplerate: Option<u32>,

    /// Output samples per block
    #[arg(long)]
    hop_size: Option<usize>,

    /// Resampling quality (best, medium, fastest, zero-order-hold, linear or 0-4)
    #[arg(short, long)]
    quality: Option<ResampleQuality>,

    /// Refuse to resample; files at another rate fail to open
    #[arg(long)]
    no_resample: bool,

    /// TOML configuration file
    #[arg(short, long, env = "MONO_SOURCE_CONFIG")]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

/// What one pass over the file produced
#[derive(Debug, Serialize)]
struct Summary {
    path: String,
    input_samplerate: u32,
    input_channels: usize,
    samplerate: u32,
    hop_size: usize,
    input_hop_size: usize,
    ratio: f64,
    blocks: usize,
    frames: usize,
    duration_seconds: f64,
    peak: f32,
    rms: f32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SourceConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => SourceConfig::default(),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mono_source={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Command line overrides the configuration file
    if let Some(samplerate) = args.samplerate {
        config.samplerate = samplerate;
    }
    if let Some(hop_size) = args.hop_size {
        config.hop_size = hop_size;
    }
    if let Some(quality) = args.quality {
        config.resampling.quality = quality;
    }
    if args.no_resample {
        config.resampling.enabled = false;
    }

    let options: SourceOptions = config.options();

    info!(
        "Reading {} at {}Hz, hop size {}",
        args.file.display(),
        config.samplerate,
        config.hop_size
    );

    let mut reader: SourceReader =
        SourceReader::open_with(&args.file, config.samplerate, config.hop_size, &options)
            .with_context(|| format!("Failed to open {}", args.file.display()))?;

    let summary = summarize(&mut reader)?;

    if let Err(e) = reader.close() {
        warn!("{}", e);
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        print_summary(&summary);
    }

    Ok(())
}

/// Drain the reader, accumulating block and level statistics
fn summarize(reader: &mut SourceReader) -> Result<Summary> {
    let mut block = vec![0.0f32; reader.hop_size()];
    let mut blocks = 0;
    let mut frames = 0;
    let mut peak = 0.0f32;
    let mut sum_squares = 0.0f64;

    loop {
        let read = reader.read(&mut block).context("Read failed")?;
        if read == 0 {
            break;
        }

        let valid = &block[..read.min(block.len())];
        for &s in valid {
            peak = peak.max(s.abs());
            sum_squares += (s as f64) * (s as f64);
        }

        blocks += 1;
        frames += valid.len();
    }

    let rms = if frames > 0 {
        (sum_squares / frames as f64).sqrt() as f32
    } else {
        0.0
    };

    Ok(Summary {
        path: reader.path().to_string(),
        input_samplerate: reader.input_samplerate(),
        input_channels: reader.input_channels(),
        samplerate: reader.samplerate(),
        hop_size: reader.hop_size(),
        input_hop_size: reader.input_hop_size(),
        ratio: reader.ratio(),
        blocks,
        frames,
        duration_seconds: frames as f64 / reader.samplerate() as f64,
        peak,
        rms,
    })
}

fn print_summary(summary: &Summary) {
    println!("File:        {}", summary.path);
    println!(
        "Input:       {} Hz, {} channel(s), {} frames per block",
        summary.input_samplerate, summary.input_channels, summary.input_hop_size
    );
    println!(
        "Output:      {} Hz mono, {} frames per block (ratio {:.6})",
        summary.samplerate, summary.hop_size, summary.ratio
    );
    println!(
        "Read:        {} blocks, {} frames ({:.3} s)",
        summary.blocks, summary.frames, summary.duration_seconds
    );
    println!("Peak:        {:.6}", summary.peak);
    println!("RMS:         {:.6}", summary.rms);
}
