//! Conforming one source window to the output format.
//!
//! A clip is processed by an ordered chain of [`PipelineStage`]s built fresh
//! for every clip: the source is bound as input, trimmed to the requested
//! window, resampled and remixed only when its format differs from the
//! output's, and appended to the [`OutputAccumulator`]. Samples move between
//! stages in blocks of at most `buffer_frames` frames.

mod mix;
mod resample;
mod trim;

use std::num::NonZeroUsize;
use std::path::Path;

use log::debug;
use symphonia::core::errors::Error as SymphoniaError;

use crate::io::{AudioBackend, SeekOutcome};
use crate::{CollageError, OutputAccumulator, SignalDescriptor};

use self::mix::ChannelMixer;
use self::resample::StreamResampler;
use self::trim::TrimWindow;

/// One step of a clip's transformation chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PipelineStage {
    /// The source stream, at its native format.
    Input { signal: SignalDescriptor },
    /// Restrict the stream to `[start_seconds, end_seconds)`.
    Trim { start_seconds: f64, end_seconds: f64 },
    Resample { from: u32, to: u32 },
    ChannelMix { from: u16, to: u16 },
    /// The destination stream, encoding at its fixed format.
    Output { signal: SignalDescriptor },
}

/// Build the stage chain that conforms `source` to `target` for one window.
pub fn build_chain(
    source: SignalDescriptor,
    target: SignalDescriptor,
    start_seconds: f64,
    length_seconds: f64,
) -> Vec<PipelineStage> {
    let mut stages = vec![
        PipelineStage::Input { signal: source },
        PipelineStage::Trim {
            start_seconds,
            end_seconds: start_seconds + length_seconds,
        },
    ];
    if source.sample_rate != target.sample_rate {
        stages.push(PipelineStage::Resample {
            from: source.sample_rate,
            to: target.sample_rate,
        });
    }
    if source.channels != target.channels {
        stages.push(PipelineStage::ChannelMix {
            from: source.channels,
            to: target.channels,
        });
    }
    stages.push(PipelineStage::Output { signal: target });
    stages
}

/// What a single [`ClipPipeline::generate_clip`] call appended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClipReport {
    /// Frames written to the destination, at the destination's rate.
    pub frames_appended: u64,
    /// Largest block, in frames, handed from the source into the chain.
    pub peak_block_frames: usize,
}

/// Interleaved samples travelling between stages.
#[derive(Debug)]
pub(crate) struct Block {
    pub(crate) samples: Vec<f32>,
    pub(crate) channels: usize,
    /// Source frame index of the first frame. Meaningful only before trimming.
    pub(crate) position: u64,
}

impl Block {
    pub(crate) fn new(samples: Vec<f32>, channels: usize, position: u64) -> Self {
        Self {
            samples,
            channels,
            position,
        }
    }

    pub(crate) fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Runtime state for the stages between input and output.
enum Node {
    Trim(TrimWindow),
    Resample(StreamResampler),
    ChannelMix(ChannelMixer),
}

impl Node {
    fn process(&mut self, block: Block) -> Result<Block, CollageError> {
        match self {
            Node::Trim(trim) => Ok(trim.process(block)),
            Node::Resample(resampler) => resampler.process(block),
            Node::ChannelMix(mixer) => Ok(mixer.process(block)),
        }
    }

    fn flush(&mut self) -> Result<Option<Block>, CollageError> {
        match self {
            Node::Resample(resampler) => resampler.flush().map(Some),
            Node::Trim(_) | Node::ChannelMix(_) => Ok(None),
        }
    }

    fn is_exhausted(&self) -> bool {
        matches!(self, Node::Trim(trim) if trim.is_exhausted())
    }
}

/// Generates clips from source files into an output accumulator.
pub struct ClipPipeline<'a> {
    backend: &'a AudioBackend,
    buffer_frames: NonZeroUsize,
}

impl<'a> ClipPipeline<'a> {
    pub fn new(backend: &'a AudioBackend, buffer_frames: NonZeroUsize) -> Self {
        Self {
            backend,
            buffer_frames,
        }
    }

    /// Append `[start_seconds, start_seconds + length_seconds)` of `source` to
    /// `destination`, conformed to the destination's signal.
    ///
    /// A window starting at or past the end of the source appends nothing and
    /// is not an error. The source is closed before this returns.
    pub fn generate_clip(
        &self,
        source: &Path,
        start_seconds: f64,
        length_seconds: f64,
        destination: &mut OutputAccumulator,
    ) -> Result<ClipReport, CollageError> {
        let mut stream = self.backend.open_read(source)?;
        let native = stream.signal();
        if native.channels == 0 || native.sample_rate == 0 {
            return Err(CollageError::OpenSource {
                path: source.to_path_buf(),
                source: SymphoniaError::Unsupported("missing channel layout or sample rate"),
            });
        }

        let stages = build_chain(native, destination.signal(), start_seconds, length_seconds);
        debug!("chain for '{}': {stages:?}", source.display());

        let mut nodes = Vec::with_capacity(stages.len());
        let mut window = (0, 0);
        for stage in &stages {
            match *stage {
                PipelineStage::Input { .. } | PipelineStage::Output { .. } => {}
                PipelineStage::Trim {
                    start_seconds: from,
                    end_seconds: to,
                } => {
                    let start = seconds_to_frames(from, native.sample_rate);
                    let end = start + seconds_to_frames(to - from, native.sample_rate);
                    window = (start, end);
                    nodes.push(Node::Trim(TrimWindow::new(start, end)));
                }
                PipelineStage::Resample { from, to } => {
                    nodes.push(Node::Resample(StreamResampler::new(
                        from,
                        to,
                        usize::from(native.channels),
                        self.buffer_frames.get(),
                    )?));
                }
                PipelineStage::ChannelMix { from, to } => {
                    nodes.push(Node::ChannelMix(ChannelMixer::new(
                        usize::from(from),
                        usize::from(to),
                    )));
                }
            }
        }

        let frames_before = destination.frames_written();
        let mut report = ClipReport::default();
        let (start, end) = window;
        let past_end = start >= end || stream.frames().is_some_and(|total| start >= total);

        if !past_end && stream.seek_to_frame(start)? != SeekOutcome::PastEnd {
            let channels = usize::from(native.channels);
            let block_samples = self.buffer_frames.get() * channels;

            while let Some(chunk) = stream.next_chunk()? {
                let mut position = chunk.position;
                for piece in chunk.samples.chunks(block_samples) {
                    let block = Block::new(piece.to_vec(), channels, position);
                    position += block.frames() as u64;
                    report.peak_block_frames = report.peak_block_frames.max(block.frames());
                    push(&mut nodes, destination, block)?;
                }
                if nodes.iter().any(Node::is_exhausted) {
                    break;
                }
            }
        }

        drain(&mut nodes, destination)?;
        report.frames_appended = destination.frames_written() - frames_before;
        Ok(report)
    }
}

fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    (seconds.max(0.0) * f64::from(sample_rate)).round() as u64
}

fn push(
    nodes: &mut [Node],
    destination: &mut OutputAccumulator,
    mut block: Block,
) -> Result<(), CollageError> {
    for node in nodes.iter_mut() {
        if block.is_empty() {
            return Ok(());
        }
        block = node.process(block)?;
    }
    if block.is_empty() {
        return Ok(());
    }
    destination.append(&block.samples)
}

/// Flush every stateful stage, passing its tail through the stages after it.
fn drain(nodes: &mut [Node], destination: &mut OutputAccumulator) -> Result<(), CollageError> {
    for index in 0..nodes.len() {
        let (head, tail) = nodes.split_at_mut(index + 1);
        if let Some(block) = head[index].flush()? {
            push(tail, destination, block)?;
        }
    }
    Ok(())
}
