//! Build one continuous audio file out of short clips drawn at random from a
//! directory of recordings.
//!
//! Longer recordings are proportionally more likely to be drawn: a point is
//! picked uniformly on the concatenated timeline of the whole corpus and the
//! clip starts there. Each clip is trimmed from its source, conformed to the
//! output signal and appended to a single WAV file.

mod config;
mod corpus;
mod error;
mod io;
mod output;
mod pipeline;
mod sampler;
mod signal;

use std::path::PathBuf;
use std::time::Duration;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use crate::config::{Config, ConfigBuilder, DEFAULT_BUFFER_FRAMES};
pub use crate::corpus::{Corpus, CorpusEntry, ScanReport};
pub use crate::error::{CollageError, ProbeError};
pub use crate::io::{AudioBackend, DecodedChunk, SeekOutcome, SignalProbe, SourceStream};
pub use crate::output::OutputAccumulator;
pub use crate::pipeline::{build_chain, ClipPipeline, ClipReport, PipelineStage};
pub use crate::sampler::{sample, SampleRequest};
pub use crate::signal::{SignalDescriptor, SourceInfo};

/// Progress notifications emitted while a run executes.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// The corpus scan finished.
    Scanned {
        files: usize,
        total_duration: Duration,
    },
    /// Clip generation is about to begin.
    Start { clips: usize },
    /// Clip `index` (zero based) was drawn and is being appended.
    Clip {
        index: usize,
        path: PathBuf,
        start_seconds: f64,
        end_seconds: f64,
    },
    Finish,
}

/// Receives [`ProgressEvent`]s. Every method has a no-op default.
pub trait ProgressReporter {
    fn report(&mut self, _event: ProgressEvent) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(ProgressEvent),
{
    fn report(&mut self, event: ProgressEvent) {
        self(event);
    }
}

struct NoProgress;

impl ProgressReporter for NoProgress {}

/// A clip that a run would generate, as produced by [`plan_clips`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedClip {
    pub path: PathBuf,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// The clips a run would generate, and the seed that draws them.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipPlan {
    /// Pass this back as the seed of a real run to write exactly these clips.
    pub seed: u64,
    pub clips: Vec<PlannedClip>,
}

/// Totals for a completed run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    /// Seed the sampler ran with; pass it back to reproduce the run.
    pub seed: u64,
    pub corpus_files: usize,
    pub corpus_seconds: f64,
    pub clips_written: usize,
    pub frames_written: u64,
    /// Largest block, in frames, that entered any clip pipeline.
    pub peak_block_frames: usize,
}

/// Perform a collage run using the supplied [`Config`].
pub fn run(config: Config) -> Result<RunSummary, CollageError> {
    run_with_progress(config, &mut NoProgress)
}

/// Perform a collage run, reporting progress to `progress`.
///
/// The output file is finalized even when a clip fails; the error is returned
/// afterwards and the output must be treated as incomplete.
pub fn run_with_progress<R: ProgressReporter + ?Sized>(
    config: Config,
    progress: &mut R,
) -> Result<RunSummary, CollageError> {
    let backend = AudioBackend::new();
    let corpus = scan_corpus(&config, &backend, progress)?;
    let seed = resolve_seed(config.seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut output = OutputAccumulator::create(&config.output_path, config.signal)?;
    let outcome = append_clips(&config, &backend, &corpus, &mut rng, &mut output, progress);
    let closed = output.close();
    let peak_block_frames = outcome?;
    let frames_written = closed?;

    progress.report(ProgressEvent::Finish);
    info!(
        "wrote {} clip(s), {frames_written} frame(s) to '{}'",
        config.clip_count,
        config.output_path.display()
    );

    Ok(RunSummary {
        seed,
        corpus_files: corpus.len(),
        corpus_seconds: corpus.total_duration(),
        clips_written: config.clip_count,
        frames_written,
        peak_block_frames,
    })
}

/// Scan the corpus and draw the clips a run with the same seed would generate,
/// without opening any source for decoding or writing any output.
pub fn plan_clips(config: &Config) -> Result<ClipPlan, CollageError> {
    let backend = AudioBackend::new();
    let corpus = scan_corpus(config, &backend, &mut NoProgress)?;
    let seed = resolve_seed(config.seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let length = config.clip_length_seconds();

    let mut clips = Vec::with_capacity(config.clip_count);
    for _ in 0..config.clip_count {
        let request = sample(&corpus, &mut rng).ok_or(CollageError::EmptyCorpus)?;
        clips.push(PlannedClip {
            path: request.path.to_path_buf(),
            start_seconds: request.offset_seconds,
            end_seconds: request.offset_seconds + length,
        });
    }
    Ok(ClipPlan { seed, clips })
}

fn scan_corpus<R: ProgressReporter + ?Sized>(
    config: &Config,
    backend: &AudioBackend,
    progress: &mut R,
) -> Result<Corpus, CollageError> {
    let mut corpus = Corpus::new();
    corpus.scan(&config.input_dir, backend, Some(&config.output_path))?;
    progress.report(ProgressEvent::Scanned {
        files: corpus.len(),
        total_duration: corpus.total_duration_as_duration(),
    });

    if config.clip_count > 0 && corpus.is_empty() {
        return Err(CollageError::EmptyCorpus);
    }
    Ok(corpus)
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!("sampling with seed {seed}");
    seed
}

fn append_clips<R: ProgressReporter + ?Sized>(
    config: &Config,
    backend: &AudioBackend,
    corpus: &Corpus,
    rng: &mut StdRng,
    output: &mut OutputAccumulator,
    progress: &mut R,
) -> Result<usize, CollageError> {
    let pipeline = ClipPipeline::new(backend, config.buffer_frames);
    let length = config.clip_length_seconds();
    let mut peak_block_frames = 0;

    progress.report(ProgressEvent::Start {
        clips: config.clip_count,
    });

    for index in 0..config.clip_count {
        let request = sample(corpus, rng).ok_or(CollageError::EmptyCorpus)?;
        let start = request.offset_seconds;
        let end = start + length;
        info!("adding {} {start:.3} {end:.3}", request.path.display());
        progress.report(ProgressEvent::Clip {
            index,
            path: request.path.to_path_buf(),
            start_seconds: start,
            end_seconds: end,
        });

        let report = pipeline.generate_clip(request.path, start, length, output)?;
        peak_block_frames = peak_block_frames.max(report.peak_block_frames);
    }

    Ok(peak_block_frames)
}
