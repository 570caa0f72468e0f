//! Audio Test File Generation Utilities
//!
//! Writes deterministic WAV files with known sample values so tests can
//! compare what the reader delivers against exactly what was encoded.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Deterministic per-channel pattern: distinct values on every channel and
/// frame, all exactly representable in 32-bit float WAV.
pub fn pattern_value(frame: usize, channel: usize) -> f32 {
    let base = ((frame * 7 + channel * 13) % 200) as f32 / 200.0;
    if channel % 2 == 0 {
        base - 0.5
    } else {
        0.5 - base
    }
}

/// Generate a 32-bit float WAV file from `value(frame, channel)`
///
/// # Arguments
/// * `path` - Output file path
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Channel count
/// * `frames` - Number of frames to write
/// * `value` - Sample value for a given frame and channel
pub fn generate_float_wav<P, F>(
    path: P,
    sample_rate: u32,
    channels: u16,
    frames: usize,
    value: F,
) -> Result<(), hound::Error>
where
    P: AsRef<Path>,
    F: Fn(usize, usize) -> f32,
{
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;

    for frame in 0..frames {
        for channel in 0..channels as usize {
            writer.write_sample(value(frame, channel))?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Generate a 16-bit sine wave WAV file with the same signal on every channel
///
/// # Arguments
/// * `path` - Output file path
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Channel count
/// * `duration_ms` - Duration in milliseconds
/// * `frequency_hz` - Sine wave frequency in Hz (e.g., 440.0 for A4)
/// * `amplitude` - Amplitude 0.0-1.0 (0.5 recommended to avoid clipping)
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;

    let total_frames = (sample_rate as u64 * duration_ms) / 1000;
    let amplitude_i16 = (amplitude * i16::MAX as f32) as i16;

    for frame_idx in 0..total_frames {
        let t = frame_idx as f32 / sample_rate as f32;
        let sample_value = (2.0 * PI * frequency_hz * t).sin();
        let sample_i16 = (sample_value * amplitude_i16 as f32) as i16;

        for _ in 0..channels {
            writer.write_sample(sample_i16)?;
        }
    }

    writer.finalize()?;
    Ok(())
}
