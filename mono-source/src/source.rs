//! Mono source reader
//!
//! Opens an audio stream, pulls one block of interleaved samples per read,
//! averages the channels down to mono and, when the requested sample rate
//! differs from the file's, resamples each block so that every read fills
//! exactly `hop_size` output samples.
//!
//! Three block sizes meet here:
//! - the file's frame layout (`input_channels` samples per frame),
//! - the block requested from the decoder (`input_hop_size` frames),
//! - the caller's block (`hop_size` frames at the target rate).
//!
//! `input_hop_size` is chosen once at open time as
//! `round(hop_size / ratio)` and never renegotiated.

use crate::decoder::{Decode, SymphoniaDecoder};
use crate::downmix::downmix_into;
use crate::error::{Error, Result};
use crate::resampler::{Resample, ResampleQuality, RubatoResampler};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, trace, warn};

/// Maximum number of input channels accounted for in the scratch ceiling
pub const MAX_CHANNELS: usize = 6;

/// Maximum number of input frames per read at [`MAX_CHANNELS`]
pub const MAX_FRAMES: usize = 4096;

/// Hard ceiling on the interleaved scratch buffer, in samples
pub const MAX_SAMPLES: usize = MAX_CHANNELS * MAX_FRAMES;

/// Round half away from zero for the non-negative values used here.
///
/// Block sizes and frame counts must match `floor(x + 0.5)` exactly at stream
/// boundaries, so this is not `f64::round_ties_even`.
pub(crate) fn round_half_up(x: f64) -> usize {
    (x + 0.5).floor() as usize
}

/// Options resolved once when a reader is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOptions {
    /// Resampling capability. `None` disables it: any stream whose rate
    /// differs from the requested one then fails to open.
    pub resampling: Option<ResampleQuality>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            resampling: Some(ResampleQuality::default()),
        }
    }
}

impl SourceOptions {
    pub fn with_quality(quality: ResampleQuality) -> Self {
        Self {
            resampling: Some(quality),
        }
    }

    pub fn without_resampling() -> Self {
        Self { resampling: None }
    }
}

/// Resampling stage, present only when the rate ratio is not 1.
struct Resampling<R> {
    resampler: R,

    /// Downmixed block at the input rate, `input_hop_size` long
    input: Vec<f32>,
}

/// Everything open-time negotiation decides about a stream.
struct Layout<R> {
    samplerate: u32,
    ratio: f64,
    input_hop_size: usize,
    resampling: Option<Resampling<R>>,
}

/// Block-wise mono reader over a [`Decode`] implementation.
///
/// Buffers are sized once at open and reused for every read. The reader
/// releases its decoder on [`close`](Self::close) or, failing that, on drop.
pub struct SourceReader<D: Decode = SymphoniaDecoder, R: Resample = RubatoResampler> {
    path: String,
    samplerate: u32,
    hop_size: usize,
    input_samplerate: u32,
    input_channels: usize,
    ratio: f64,
    input_hop_size: usize,

    /// Interleaved samples of one read, `input_hop_size * input_channels` long
    scratch: Vec<f32>,

    resampling: Option<Resampling<R>>,
    decoder: D,

    /// Decoder has returned 0 samples at least once
    exhausted: bool,

    /// Decoder already released
    closed: bool,
}

impl SourceReader {
    /// Open `path` with the symphonia decoder and default options.
    ///
    /// `samplerate` of 0 keeps the file's native rate.
    pub fn open(path: impl AsRef<Path>, samplerate: u32, hop_size: usize) -> Result<Self> {
        Self::open_with(path, samplerate, hop_size, &SourceOptions::default())
    }
}

impl<D: Decode> SourceReader<D> {
    /// Open `path` through decoder `D`.
    pub fn open_with(
        path: impl AsRef<Path>,
        samplerate: u32,
        hop_size: usize,
        options: &SourceOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();

        if name.is_empty() {
            error!("Aborted opening null path");
            return Err(Error::InvalidArgument("path is empty".to_string()));
        }

        let decoder = match D::open(path) {
            Ok(decoder) => decoder,
            Err(e) => {
                error!("{}", e);
                log_open_failure(&name, samplerate, hop_size);
                return Err(e);
            }
        };

        Self::from_decoder(name, decoder, samplerate, hop_size, options)
    }

    /// Wrap an already opened decoder. `path` only names the stream in
    /// diagnostics.
    pub fn from_decoder(
        path: impl Into<String>,
        decoder: D,
        samplerate: u32,
        hop_size: usize,
        options: &SourceOptions,
    ) -> Result<Self> {
        Self::with_resampler(path, decoder, samplerate, hop_size, options)
    }
}

impl<D: Decode, R: Resample> SourceReader<D, R> {
    /// Wrap an already opened decoder, resampling through `R`.
    ///
    /// On any failure the decoder is closed before the error is returned.
    pub fn with_resampler(
        path: impl Into<String>,
        mut decoder: D,
        samplerate: u32,
        hop_size: usize,
        options: &SourceOptions,
    ) -> Result<Self> {
        let path = path.into();

        let layout = match Self::negotiate(&path, &decoder, samplerate, hop_size, options) {
            Ok(layout) => layout,
            Err(e) => {
                error!("{}", e);
                log_open_failure(&path, samplerate, hop_size);
                if let Err(close_err) = decoder.close() {
                    error!("Error closing file {}: {}", path, close_err);
                }
                return Err(e);
            }
        };

        let input_channels = decoder.channels();
        let scratch = vec![0.0; layout.input_hop_size * input_channels];

        debug!(
            "Opened {}: {}Hz x{} -> {}Hz mono, hop {} (input hop {}, ratio {})",
            path,
            decoder.samplerate(),
            input_channels,
            layout.samplerate,
            hop_size,
            layout.input_hop_size,
            layout.ratio
        );

        Ok(Self {
            path,
            samplerate: layout.samplerate,
            hop_size,
            input_samplerate: decoder.samplerate(),
            input_channels,
            ratio: layout.ratio,
            input_hop_size: layout.input_hop_size,
            scratch,
            resampling: layout.resampling,
            decoder,
            exhausted: false,
            closed: false,
        })
    }

    /// Validate parameters against the stream and size the blocks.
    fn negotiate(
        path: &str,
        decoder: &D,
        samplerate: u32,
        hop_size: usize,
        options: &SourceOptions,
    ) -> Result<Layout<R>> {
        if hop_size == 0 {
            return Err(Error::InvalidArgument("hop_size must be positive".to_string()));
        }

        let input_samplerate = decoder.samplerate();
        let input_channels = decoder.channels();

        if input_samplerate == 0 || input_channels == 0 {
            return Err(Error::Open {
                path: path.to_string(),
                reason: format!(
                    "invalid stream layout ({}Hz, {} channels)",
                    input_samplerate, input_channels
                ),
            });
        }

        let samplerate = if samplerate == 0 {
            input_samplerate
        } else {
            samplerate
        };

        let ratio = samplerate as f64 / input_samplerate as f64;
        let input_hop_size = round_half_up(hop_size as f64 / ratio);

        let exceeds = input_hop_size
            .checked_mul(input_channels)
            .map_or(true, |samples| samples > MAX_SAMPLES);
        if exceeds {
            return Err(Error::Capacity {
                frames: input_hop_size,
                channels: input_channels,
                max: MAX_SAMPLES / input_channels,
            });
        }

        let mut resampling = None;
        if ratio != 1.0 {
            let Some(quality) = options.resampling else {
                return Err(Error::UnsupportedRatio {
                    from: input_samplerate,
                    to: samplerate,
                    reason: "resampling is disabled".to_string(),
                });
            };

            if ratio > 1.0 {
                // Without a carry-over buffer, each input block must map to
                // exactly one output block.
                if round_half_up(input_hop_size as f64 * ratio) != hop_size {
                    return Err(Error::UnsupportedRatio {
                        from: input_samplerate,
                        to: samplerate,
                        reason: format!(
                            "{} input frames do not upsample to a hop_size of {}",
                            input_hop_size, hop_size
                        ),
                    });
                }
                warn!(
                    "upsampling {} from {} to {}",
                    path, input_samplerate, samplerate
                );
            }

            resampling = Some(Resampling {
                resampler: R::create(ratio, quality, input_hop_size, hop_size)?,
                input: vec![0.0; input_hop_size],
            });
        }

        Ok(Layout {
            samplerate,
            ratio,
            input_hop_size,
            resampling,
        })
    }

    /// Read the next block into the front of `output`.
    ///
    /// `output` must hold at least [`hop_size`](Self::hop_size) samples.
    /// Returns how many leading samples are valid; the count shrinks on the
    /// final block and is 0 once the stream is exhausted. Samples past the
    /// returned count are unspecified.
    pub fn read(&mut self, output: &mut [f32]) -> Result<usize> {
        if output.len() < self.hop_size {
            return Err(Error::InvalidArgument(format!(
                "output buffer holds {} samples, hop_size is {}",
                output.len(),
                self.hop_size
            )));
        }

        let read_samples = self.decoder.read(&mut self.scratch);
        let channels = self.input_channels;
        let interleaved = &self.scratch[..read_samples];

        match self.resampling.as_mut() {
            Some(stage) => {
                downmix_into(interleaved, channels, &mut stage.input);
                stage
                    .resampler
                    .process(&stage.input, &mut output[..self.hop_size])?;
            }
            None => {
                downmix_into(interleaved, channels, &mut output[..self.input_hop_size]);
            }
        }

        let frames_read = round_half_up(self.ratio * read_samples as f64 / channels as f64);

        if read_samples == 0 && !self.exhausted {
            self.exhausted = true;
            debug!("End of stream: {}", self.path);
        }
        trace!(
            "Read {} samples from {}, {} frames out",
            read_samples,
            self.path,
            frames_read
        );

        Ok(frames_read)
    }

    /// Read every remaining block and concatenate the valid samples.
    pub fn read_to_end(&mut self) -> Result<Vec<f32>> {
        let mut samples = Vec::new();
        let mut block = vec![0.0; self.hop_size];

        loop {
            let frames = self.read(&mut block)?;
            if frames == 0 {
                break;
            }
            samples.extend_from_slice(&block[..frames.min(self.hop_size)]);
        }

        Ok(samples)
    }

    /// Release the decoder, resampler and buffers.
    ///
    /// A decoder close failure is logged and returned as [`Error::Close`];
    /// everything is released either way.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.decoder.close().map_err(|e| match e {
            Error::Close { .. } => e,
            other => Error::Close {
                path: self.path.clone(),
                reason: other.to_string(),
            },
        });
        if let Err(ref e) = result {
            error!("{}", e);
        }

        self.resampling = None;
        self.scratch = Vec::new();
        info!("Closed {}", self.path);

        result
    }

    /// Stream identifier given at open
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Output sample rate (the file's rate if 0 was requested)
    pub fn samplerate(&self) -> u32 {
        self.samplerate
    }

    /// Output samples per read
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Output channel count, always 1
    pub fn channels(&self) -> usize {
        1
    }

    pub fn input_samplerate(&self) -> u32 {
        self.input_samplerate
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Output rate divided by input rate
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Input frames requested from the decoder per read
    pub fn input_hop_size(&self) -> usize {
        self.input_hop_size
    }

    pub fn is_resampling(&self) -> bool {
        self.resampling.is_some()
    }
}

impl<D: Decode, R: Resample> Drop for SourceReader<D, R> {
    fn drop(&mut self) {
        // Errors were already logged by release()
        let _ = self.release();
    }
}

impl<D: Decode, R: Resample> fmt::Debug for SourceReader<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceReader")
            .field("path", &self.path)
            .field("samplerate", &self.samplerate)
            .field("hop_size", &self.hop_size)
            .field("input_samplerate", &self.input_samplerate)
            .field("input_channels", &self.input_channels)
            .field("ratio", &self.ratio)
            .field("input_hop_size", &self.input_hop_size)
            .field("resampling", &self.resampling.is_some())
            .finish_non_exhaustive()
    }
}

fn log_open_failure(path: &str, samplerate: u32, hop_size: usize) {
    error!(
        "can not read {} at samplerate {}Hz with a hop_size of {}",
        path, samplerate, hop_size
    );
}
