//! In-memory decoder
//!
//! Serves interleaved samples that are already in RAM. Used for synthetic
//! streams and for files small enough to preload in one pass.

use crate::decoder::{Decode, SymphoniaDecoder};
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Decoder over a fully decoded interleaved buffer.
#[derive(Debug, Clone)]
pub struct MemoryDecoder {
    samples: Vec<f32>,
    samplerate: u32,
    channels: usize,
    position: usize,
}

impl MemoryDecoder {
    /// Wrap interleaved `samples` with `channels` channels at `samplerate` Hz.
    ///
    /// A trailing partial frame is kept; readers only downmix whole frames.
    pub fn new(samples: Vec<f32>, samplerate: u32, channels: usize) -> Self {
        Self {
            samples,
            samplerate,
            channels,
            position: 0,
        }
    }

    /// Total number of interleaved samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples not yet handed out
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl Decode for MemoryDecoder {
    /// Preload `path` entirely with [`SymphoniaDecoder`].
    fn open(path: &Path) -> Result<Self> {
        let mut file = SymphoniaDecoder::open(path)?;
        let samplerate = file.samplerate();
        let channels = file.channels();

        let mut samples = Vec::new();
        let mut block = vec![0.0f32; 4096 * channels.max(1)];
        loop {
            let n = file.read(&mut block);
            if n == 0 {
                break;
            }
            samples.extend_from_slice(&block[..n]);
        }

        file.close().map_err(|e| Error::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!(
            "Preloaded {}: {} samples ({} frames)",
            path.display(),
            samples.len(),
            samples.len() / channels.max(1)
        );

        Ok(Self::new(samples, samplerate, channels))
    }

    fn samplerate(&self) -> u32 {
        self.samplerate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn read(&mut self, buf: &mut [f32]) -> usize {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.samples[self.position..self.position + n]);
        self.position += n;
        n
    }

    fn close(&mut self) -> Result<()> {
        self.samples = Vec::new();
        self.position = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_in_blocks() {
        let mut decoder = MemoryDecoder::new((0..10).map(|i| i as f32).collect(), 8000, 2);
        let mut buf = [0.0f32; 4];

        assert_eq!(decoder.read(&mut buf), 4);
        assert_eq!(buf, [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(decoder.read(&mut buf), 4);
        assert_eq!(decoder.read(&mut buf), 2);
        assert_eq!(&buf[..2], &[8.0, 9.0]);
        assert_eq!(decoder.read(&mut buf), 0);
        assert_eq!(decoder.read(&mut buf), 0);
    }

    #[test]
    fn test_close_releases_samples() {
        let mut decoder = MemoryDecoder::new(vec![0.5; 16], 8000, 1);
        decoder.close().unwrap();
        assert!(decoder.is_empty());
        assert_eq!(decoder.read(&mut [0.0; 4]), 0);
    }
}
