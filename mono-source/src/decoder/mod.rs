//! Decoding collaborators
//!
//! A decoder hands out interleaved `f32` samples in the file's native rate and
//! channel layout. The reader never looks past this trait, so any format
//! backend (or an in-memory stream) can sit underneath it.

mod file;
mod memory;

pub use self::file::SymphoniaDecoder;
pub use self::memory::MemoryDecoder;

use crate::error::Result;
use std::path::Path;

/// Source of interleaved native-format samples.
pub trait Decode: Send {
    /// Open `path` for reading.
    ///
    /// Fails with [`crate::Error::Open`] when the file is missing or its
    /// format is not recognized.
    fn open(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Native sample rate of the stream
    fn samplerate(&self) -> u32;

    /// Native channel count of the stream
    fn channels(&self) -> usize;

    /// Fill `buf` with up to `buf.len()` interleaved samples.
    ///
    /// Returns the number of samples written. A count smaller than
    /// `buf.len()` means the stream is ending; 0 means it has ended.
    fn read(&mut self, buf: &mut [f32]) -> usize;

    /// Release the underlying handle.
    ///
    /// Called exactly once by the reader. Errors are diagnostics only.
    fn close(&mut self) -> Result<()>;
}
