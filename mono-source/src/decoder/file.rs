//! Audio file decoder using symphonia
//!
//! Decodes any format enabled in Cargo.toml (MP3, FLAC, AAC, MP4/M4A, Vorbis,
//! WAV/PCM) and hands out interleaved f32 samples in whatever quantity the
//! caller asks for, independent of the codec's packet size.

use crate::decoder::Decode;
use crate::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace, warn};

/// Streaming decoder for a single audio track.
///
/// Decoded packets are staged in `pending` and drained by [`Decode::read`],
/// so a read may span several packets or consume part of one.
pub struct SymphoniaDecoder {
    /// File being decoded (for diagnostics)
    path: PathBuf,

    /// Symphonia format reader
    format: Box<dyn FormatReader>,

    /// Symphonia decoder
    decoder: Box<dyn Decoder>,

    /// Track being decoded
    track_id: u32,

    /// Native sample rate of the audio file
    samplerate: u32,

    /// Number of channels in the audio file
    channels: usize,

    /// Conversion buffer reused across packets
    sample_buf: Option<SampleBuffer<f32>>,

    /// Interleaved samples of the last decoded packet
    pending: Vec<f32>,

    /// Read position inside `pending`
    pending_pos: usize,

    /// Set once the format reader has no more packets
    finished: bool,
}

impl SymphoniaDecoder {
    /// Path this decoder was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the next packet of our track into `pending`.
    ///
    /// Returns false once the stream is exhausted. Undecodable packets are
    /// skipped; any other reader error ends the stream.
    fn decode_next(&mut self) -> bool {
        loop {
            if self.finished {
                return false;
            }

            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file: {}", self.path.display());
                    self.finished = true;
                    return false;
                }
                Err(e) => {
                    warn!("Error reading packet from {}: {}", self.path.display(), e);
                    self.finished = true;
                    return false;
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => {
                    warn!("Fatal decode error in {}: {}", self.path.display(), e);
                    self.finished = true;
                    return false;
                }
            };

            let spec = *decoded.spec();
            let required = decoded.capacity() * spec.channels.count();
            if self
                .sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < required)
            {
                self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            self.pending.clear();
            self.pending_pos = 0;
            if let Some(buf) = self.sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                self.pending.extend_from_slice(buf.samples());
            }

            trace!("Decoded packet: {} samples", self.pending.len());

            if !self.pending.is_empty() {
                return true;
            }
        }
    }
}

impl Decode for SymphoniaDecoder {
    fn open(path: &Path) -> Result<Self> {
        let open_error = |reason: String| Error::Open {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| open_error(e.to_string()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| open_error(format!("Failed to probe format: {}", e)))?;

        let format = probed.format;

        // Get the default audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| open_error("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let samplerate = codec_params
            .sample_rate
            .ok_or_else(|| open_error("Sample rate not found".to_string()))?;

        let channels = codec_params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| open_error("Channel count not found".to_string()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| open_error(format!("Failed to create decoder: {}", e)))?;

        debug!(
            "Opened {}: samplerate={}, channels={}",
            path.display(),
            samplerate,
            channels
        );

        Ok(Self {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            samplerate,
            channels,
            sample_buf: None,
            pending: Vec::new(),
            pending_pos: 0,
            finished: false,
        })
    }

    fn samplerate(&self) -> u32 {
        self.samplerate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn read(&mut self, buf: &mut [f32]) -> usize {
        let mut written = 0;

        while written < buf.len() {
            if self.pending_pos == self.pending.len() && !self.decode_next() {
                break;
            }

            let available = self.pending.len() - self.pending_pos;
            let n = available.min(buf.len() - written);
            buf[written..written + n]
                .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
            written += n;
            self.pending_pos += n;
        }

        written
    }

    fn close(&mut self) -> Result<()> {
        // The file handle itself is released when the format reader drops.
        self.finished = true;
        self.pending = Vec::new();
        self.pending_pos = 0;
        self.sample_buf = None;
        debug!("Closed {}", self.path.display());
        Ok(())
    }
}
