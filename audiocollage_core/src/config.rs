use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CollageError, SignalDescriptor};

/// Frames per block handed between pipeline stages unless configured otherwise.
pub const DEFAULT_BUFFER_FRAMES: usize = 4_096;

/// Configuration for a collage run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Canonicalized directory scanned recursively for source files.
    pub input_dir: PathBuf,
    /// File the collage is written to. Existing files are overwritten.
    pub output_path: PathBuf,
    /// Length of each clip window.
    pub clip_length: Duration,
    /// Number of clips to draw and append.
    pub clip_count: usize,
    /// Seed for the sampler. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Format of the output stream.
    pub signal: SignalDescriptor,
    /// Upper bound on frames per block moving through the clip pipeline.
    pub buffer_frames: NonZeroUsize,
}

impl Config {
    /// Construct a [`Config`] with the default count, signal and buffer size.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        input_dir: P,
        output_path: Q,
        clip_length: Duration,
    ) -> Result<Self, CollageError> {
        Self::builder(input_dir, output_path, clip_length).build()
    }

    pub fn builder<P: AsRef<Path>, Q: AsRef<Path>>(
        input_dir: P,
        output_path: Q,
        clip_length: Duration,
    ) -> ConfigBuilder {
        ConfigBuilder {
            input_dir: input_dir.as_ref().to_path_buf(),
            output_path: output_path.as_ref().to_path_buf(),
            clip_length,
            clip_count: 10,
            seed: None,
            signal: SignalDescriptor::CD_QUALITY,
            buffer_frames: NonZeroUsize::new(DEFAULT_BUFFER_FRAMES)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn clip_length_seconds(&self) -> f64 {
        self.clip_length.as_secs_f64()
    }
}

/// Builder for [`Config`]; validation happens in [`ConfigBuilder::build`].
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    input_dir: PathBuf,
    output_path: PathBuf,
    clip_length: Duration,
    clip_count: usize,
    seed: Option<u64>,
    signal: SignalDescriptor,
    buffer_frames: NonZeroUsize,
}

impl ConfigBuilder {
    pub fn clip_count(mut self, count: usize) -> Self {
        self.clip_count = count;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn signal(mut self, signal: SignalDescriptor) -> Self {
        self.signal = signal;
        self
    }

    pub fn buffer_frames(mut self, frames: NonZeroUsize) -> Self {
        self.buffer_frames = frames;
        self
    }

    pub fn build(self) -> Result<Config, CollageError> {
        if self.clip_length.is_zero() {
            return Err(CollageError::InvalidClipLength);
        }
        self.signal.validate_output()?;
        if !self.input_dir.is_dir() {
            return Err(CollageError::MissingInputDirectory(self.input_dir));
        }
        let input_dir = fs::canonicalize(&self.input_dir)?;

        Ok(Config {
            input_dir,
            output_path: self.output_path,
            clip_length: self.clip_length,
            clip_count: self.clip_count,
            seed: self.seed,
            signal: self.signal,
            buffer_frames: self.buffer_frames,
        })
    }
}
