//! Block resampling using rubato
//!
//! The reader configures one resampler per stream at open time: every call
//! consumes exactly `input_len` mono samples and produces exactly
//! `output_len` samples. Filter state carries across calls and is never reset.

use crate::error::{Error, Result};
use rubato::{
    FastFixedIn, PolynomialDegree, ResampleError, Resampler as RubatoResamplerTrait,
    SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Converter quality, ordered from most to least expensive.
///
/// Levels follow the classic 0..=4 numbering used by sample-rate converters,
/// so `4` (linear) is the historical default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleQuality {
    /// Long windowed-sinc filter
    Best,
    /// Medium windowed-sinc filter
    Medium,
    /// Short windowed-sinc filter
    Fastest,
    /// Nearest-sample hold
    ZeroOrderHold,
    /// Linear interpolation
    #[default]
    Linear,
}

impl ResampleQuality {
    /// Map a numeric quality level (0 = best .. 4 = linear).
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Best),
            1 => Some(Self::Medium),
            2 => Some(Self::Fastest),
            3 => Some(Self::ZeroOrderHold),
            4 => Some(Self::Linear),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Best => 0,
            Self::Medium => 1,
            Self::Fastest => 2,
            Self::ZeroOrderHold => 3,
            Self::Linear => 4,
        }
    }

    fn sinc_parameters(self) -> Option<SincInterpolationParameters> {
        let (sinc_len, oversampling_factor, interpolation) = match self {
            Self::Best => (256, 256, SincInterpolationType::Cubic),
            Self::Medium => (128, 128, SincInterpolationType::Linear),
            Self::Fastest => (64, 64, SincInterpolationType::Linear),
            Self::ZeroOrderHold | Self::Linear => return None,
        };

        Some(SincInterpolationParameters {
            sinc_len,
            f_cutoff: 0.95,
            interpolation,
            oversampling_factor,
            window: WindowFunction::BlackmanHarris2,
        })
    }
}

impl fmt::Display for ResampleQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Best => "best",
            Self::Medium => "medium",
            Self::Fastest => "fastest",
            Self::ZeroOrderHold => "zero-order-hold",
            Self::Linear => "linear",
        };
        f.write_str(name)
    }
}

impl FromStr for ResampleQuality {
    type Err = String;

    /// Accepts either the name or the numeric level.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best" => Ok(Self::Best),
            "medium" => Ok(Self::Medium),
            "fastest" => Ok(Self::Fastest),
            "zero-order-hold" | "zoh" => Ok(Self::ZeroOrderHold),
            "linear" => Ok(Self::Linear),
            other => other
                .parse::<u8>()
                .ok()
                .and_then(Self::from_level)
                .ok_or_else(|| format!("unknown resampling quality '{}'", s)),
        }
    }
}

/// Fixed-block mono sample-rate converter.
pub trait Resample: Send {
    /// Build a converter for `ratio` (output rate / input rate) that maps
    /// `input_len` samples to `output_len` samples per call.
    fn create(
        ratio: f64,
        quality: ResampleQuality,
        input_len: usize,
        output_len: usize,
    ) -> Result<Self>
    where
        Self: Sized;

    /// Convert one block. `input` must hold exactly `input_len` samples;
    /// exactly `output_len` samples are written to the front of `output`.
    fn process(&mut self, input: &[f32], output: &mut [f32]) -> Result<()>;
}

enum Engine {
    Polynomial(FastFixedIn<f32>),
    Sinc(SincFixedIn<f32>),
}

impl Engine {
    fn process_into_buffer(
        &mut self,
        input: &[Vec<f32>],
        output: &mut [Vec<f32>],
    ) -> std::result::Result<(usize, usize), ResampleError> {
        match self {
            Engine::Polynomial(r) => r.process_into_buffer(input, output, None),
            Engine::Sinc(r) => r.process_into_buffer(input, output, None),
        }
    }

    fn output_frames_max(&self) -> usize {
        match self {
            Engine::Polynomial(r) => r.output_frames_max(),
            Engine::Sinc(r) => r.output_frames_max(),
        }
    }
}

/// rubato-backed implementation of [`Resample`].
///
/// rubato's fixed-input resamplers emit a slightly varying number of frames
/// per chunk. Surplus frames are carried into the next block (at most one
/// block's worth) and a deficit is zero-filled, so callers always see
/// `output_len` samples.
pub struct RubatoResampler {
    engine: Engine,
    quality: ResampleQuality,
    input_len: usize,
    output_len: usize,

    /// Planar input scratch (one channel)
    input: Vec<Vec<f32>>,

    /// Planar output scratch (one channel), sized to the engine maximum
    output: Vec<Vec<f32>>,

    /// Converted samples not yet delivered
    carry: Vec<f32>,
}

impl RubatoResampler {
    pub fn quality(&self) -> ResampleQuality {
        self.quality
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn output_len(&self) -> usize {
        self.output_len
    }
}

impl Resample for RubatoResampler {
    fn create(
        ratio: f64,
        quality: ResampleQuality,
        input_len: usize,
        output_len: usize,
    ) -> Result<Self> {
        if input_len == 0 || output_len == 0 {
            return Err(Error::Resample(format!(
                "block sizes must be non-zero (input {}, output {})",
                input_len, output_len
            )));
        }

        let engine = match quality.sinc_parameters() {
            Some(params) => SincFixedIn::<f32>::new(ratio, 1.0, params, input_len, 1)
                .map(Engine::Sinc),
            None => {
                let degree = match quality {
                    ResampleQuality::ZeroOrderHold => PolynomialDegree::Nearest,
                    _ => PolynomialDegree::Linear,
                };
                FastFixedIn::<f32>::new(ratio, 1.0, degree, input_len, 1)
                    .map(Engine::Polynomial)
            }
        }
        .map_err(|e| Error::Resample(format!("Failed to create resampler: {}", e)))?;

        let output_max = engine.output_frames_max();

        debug!(
            "Created {} resampler: ratio={}, {} -> {} samples per block",
            quality, ratio, input_len, output_len
        );

        Ok(Self {
            engine,
            quality,
            input_len,
            output_len,
            input: vec![vec![0.0; input_len]],
            output: vec![vec![0.0; output_max]],
            carry: Vec::with_capacity(output_len + output_max),
        })
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        if input.len() != self.input_len {
            return Err(Error::Resample(format!(
                "expected input block of {} samples, got {}",
                self.input_len,
                input.len()
            )));
        }
        if output.len() < self.output_len {
            return Err(Error::Resample(format!(
                "output block holds {} samples, need {}",
                output.len(),
                self.output_len
            )));
        }

        self.input[0].copy_from_slice(input);
        let (_, written) = self
            .engine
            .process_into_buffer(&self.input, &mut self.output)
            .map_err(|e| Error::Resample(format!("Resampling failed: {}", e)))?;
        self.carry.extend_from_slice(&self.output[0][..written]);

        let n = self.carry.len().min(self.output_len);
        output[..n].copy_from_slice(&self.carry[..n]);
        output[n..self.output_len].fill(0.0);
        self.carry.drain(..n);

        if self.carry.len() > self.output_len {
            let excess = self.carry.len() - self.output_len;
            warn!("Dropping {} surplus resampled samples", excess);
            self.carry.drain(..excess);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_block(len: usize, offset: usize, rate: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = (offset + i) as f32 / rate;
                (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
            })
            .collect()
    }

    #[test]
    fn test_quality_levels() {
        for level in 0..=4 {
            let quality = ResampleQuality::from_level(level).unwrap();
            assert_eq!(quality.level(), level);
        }
        assert_eq!(ResampleQuality::from_level(5), None);
        assert_eq!(ResampleQuality::default(), ResampleQuality::Linear);
    }

    #[test]
    fn test_quality_from_str() {
        assert_eq!("best".parse::<ResampleQuality>(), Ok(ResampleQuality::Best));
        assert_eq!("ZOH".parse::<ResampleQuality>(), Ok(ResampleQuality::ZeroOrderHold));
        assert_eq!("4".parse::<ResampleQuality>(), Ok(ResampleQuality::Linear));
        assert!("9".parse::<ResampleQuality>().is_err());
        assert!("cubic".parse::<ResampleQuality>().is_err());
    }

    #[test]
    fn test_exact_output_length_downsampling() {
        let mut resampler =
            RubatoResampler::create(0.5, ResampleQuality::Linear, 512, 256).unwrap();
        let mut output = vec![f32::NAN; 300];

        for block in 0..8 {
            let input = sine_block(512, block * 512, 44100.0);
            resampler.process(&input, &mut output).unwrap();
            assert!(output[..256].iter().all(|s| s.is_finite()));
        }

        // Only the first output_len samples are touched
        assert!(output[256..].iter().all(|s| s.is_nan()));
    }

    #[test]
    fn test_carry_stays_within_one_block() {
        let mut resampler =
            RubatoResampler::create(44100.0 / 48000.0, ResampleQuality::Linear, 480, 441).unwrap();
        assert_eq!(resampler.quality(), ResampleQuality::Linear);
        assert_eq!(resampler.input_len(), 480);
        assert_eq!(resampler.output_len(), 441);

        let mut output = vec![0.0; 441];
        for block in 0..100 {
            let input = sine_block(480, block * 480, 48000.0);
            resampler.process(&input, &mut output).unwrap();
            assert!(
                resampler.carry.len() <= resampler.output_len(),
                "block {}: {} samples carried",
                block,
                resampler.carry.len()
            );
        }
    }

    #[test]
    fn test_exact_output_length_upsampling() {
        let mut resampler =
            RubatoResampler::create(2.0, ResampleQuality::Linear, 256, 512).unwrap();
        let mut output = vec![0.0; 512];

        for block in 0..8 {
            let input = sine_block(256, block * 256, 22050.0);
            resampler.process(&input, &mut output).unwrap();
        }

        let energy: f32 = output.iter().map(|s| s * s).sum();
        assert!(energy > 0.0, "Upsampled sine should not be silent");
    }

    #[test]
    fn test_dc_passes_through_linear() {
        let mut resampler =
            RubatoResampler::create(0.5, ResampleQuality::Linear, 512, 256).unwrap();
        let input = vec![0.5; 512];
        let mut output = vec![0.0; 256];

        for _ in 0..6 {
            resampler.process(&input, &mut output).unwrap();
        }

        for &s in &output[32..224] {
            assert!((s - 0.5).abs() < 1e-3, "Expected DC level 0.5, got {}", s);
        }
    }

    #[test]
    fn test_sinc_qualities_construct() {
        for quality in [
            ResampleQuality::Best,
            ResampleQuality::Medium,
            ResampleQuality::Fastest,
            ResampleQuality::ZeroOrderHold,
        ] {
            let mut resampler = RubatoResampler::create(0.5, quality, 1024, 512).unwrap();
            let mut output = vec![0.0; 512];
            resampler.process(&vec![0.25; 1024], &mut output).unwrap();
            assert_eq!(resampler.quality(), quality);
        }
    }

    #[test]
    fn test_wrong_input_length_rejected() {
        let mut resampler =
            RubatoResampler::create(0.5, ResampleQuality::Linear, 512, 256).unwrap();
        let mut output = vec![0.0; 256];

        match resampler.process(&vec![0.0; 511], &mut output) {
            Err(Error::Resample(msg)) => assert!(msg.contains("512"), "{}", msg),
            other => panic!("Expected Resample error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_output_rejected() {
        let mut resampler =
            RubatoResampler::create(0.5, ResampleQuality::Linear, 512, 256).unwrap();
        let mut output = vec![0.0; 255];
        assert!(resampler.process(&vec![0.0; 512], &mut output).is_err());
    }

    #[test]
    fn test_zero_block_rejected() {
        assert!(RubatoResampler::create(0.5, ResampleQuality::Linear, 0, 256).is_err());
    }
}
