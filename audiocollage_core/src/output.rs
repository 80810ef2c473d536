use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::WavWriter;
use log::debug;

use crate::{CollageError, SignalDescriptor};

/// The single destination stream that every clip is appended to.
///
/// The file is created by [`OutputAccumulator::create`] and finalized by
/// [`OutputAccumulator::close`]. If the accumulator is dropped without being
/// closed, the writer still finalizes the header on drop.
pub struct OutputAccumulator {
    writer: WavWriter<BufWriter<File>>,
    path: PathBuf,
    signal: SignalDescriptor,
    scale: f64,
    frames_written: u64,
}

impl OutputAccumulator {
    pub fn create(path: &Path, signal: SignalDescriptor) -> Result<Self, CollageError> {
        signal.validate_output()?;
        let writer = WavWriter::create(path, signal.wav_spec()).map_err(|source| {
            CollageError::OpenDestination {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!("opened '{}' for writing ({signal})", path.display());

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            signal,
            scale: ((1u64 << (signal.bit_depth - 1)) - 1) as f64,
            frames_written: 0,
        })
    }

    pub fn signal(&self) -> SignalDescriptor {
        self.signal
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Seconds of audio appended so far.
    pub fn seconds_written(&self) -> f64 {
        self.frames_written as f64 / f64::from(self.signal.sample_rate)
    }

    /// Encode interleaved samples in `[-1.0, 1.0]` at the output bit depth.
    pub fn append(&mut self, samples: &[f32]) -> Result<(), CollageError> {
        let channels = usize::from(self.signal.channels);
        debug_assert_eq!(samples.len() % channels, 0);

        for &sample in samples {
            let value = (f64::from(sample).clamp(-1.0, 1.0) * self.scale).round() as i32;
            self.writer.write_sample(value)?;
        }
        self.frames_written += (samples.len() / channels) as u64;
        Ok(())
    }

    /// Flush buffered samples and finalize the WAV header.
    pub fn close(self) -> Result<u64, CollageError> {
        let frames = self.frames_written;
        self.writer.finalize()?;
        debug!("closed '{}' after {frames} frame(s)", self.path.display());
        Ok(frames)
    }
}
