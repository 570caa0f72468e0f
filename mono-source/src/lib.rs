//! # mono-source
//!
//! Block-wise audio file reader producing mono `f32` frames at a requested
//! sample rate.
//!
//! **Purpose:** Decode an audio file one block at a time, average its channels
//! into one, and resample each block so every read returns exactly `hop_size`
//! samples (fewer only at the end of the stream).
//!
//! **Architecture:** [`SourceReader`] drives two collaborators: a [`Decode`]
//! implementation (symphonia by default) and a [`Resample`] implementation
//! (rubato by default).
//!
//! ```no_run
//! use mono_source::SourceReader;
//!
//! let mut reader = SourceReader::open("track.flac", 22050, 256)?;
//! let mut block = vec![0.0f32; reader.hop_size()];
//! loop {
//!     let frames = reader.read(&mut block)?;
//!     if frames == 0 {
//!         break;
//!     }
//!     // block[..frames] holds mono samples at 22050 Hz
//! }
//! reader.close()?;
//! # Ok::<(), mono_source::Error>(())
//! ```

pub mod config;
pub mod decoder;
pub mod downmix;
pub mod error;
pub mod resampler;
pub mod source;

pub use config::SourceConfig;
pub use decoder::{Decode, MemoryDecoder, SymphoniaDecoder};
pub use error::{Error, Result};
pub use resampler::{Resample, ResampleQuality, RubatoResampler};
pub use source::{SourceOptions, SourceReader, MAX_CHANNELS, MAX_FRAMES, MAX_SAMPLES};
