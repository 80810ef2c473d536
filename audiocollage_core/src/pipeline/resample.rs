use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use super::Block;
use crate::CollageError;

/// Streaming sample-rate converter on top of a fixed-input-size rubato resampler.
///
/// Input is queued per channel and fed in chunks of `chunk` frames. The
/// resampler's inherent delay is dropped from the head of the output and
/// [`StreamResampler::flush`] pads the tail so that the total output length is
/// `round(frames_in * to / from)`.
pub(crate) struct StreamResampler {
    resampler: FastFixedIn<f32>,
    channels: usize,
    ratio: f64,
    chunk: usize,
    pending: Vec<Vec<f32>>,
    delay: usize,
    frames_in: u64,
    frames_out: u64,
}

impl StreamResampler {
    pub(crate) fn new(
        from: u32,
        to: u32,
        channels: usize,
        chunk: usize,
    ) -> Result<Self, CollageError> {
        let ratio = f64::from(to) / f64::from(from);
        let resampler =
            FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, chunk, channels)?;
        let delay = resampler.output_delay();

        Ok(Self {
            resampler,
            channels,
            ratio,
            chunk,
            pending: vec![Vec::with_capacity(chunk); channels],
            delay,
            frames_in: 0,
            frames_out: 0,
        })
    }

    pub(crate) fn process(&mut self, block: Block) -> Result<Block, CollageError> {
        debug_assert_eq!(block.channels, self.channels);
        self.frames_in += block.frames() as u64;
        for frame in block.samples.chunks_exact(self.channels) {
            for (queue, &sample) in self.pending.iter_mut().zip(frame) {
                queue.push(sample);
            }
        }

        let mut out = Vec::new();
        while self.pending[0].len() >= self.resampler.input_frames_next() {
            let needed = self.resampler.input_frames_next();
            let input: Vec<&[f32]> = self.pending.iter().map(|queue| &queue[..needed]).collect();
            let produced = self.resampler.process(&input, None)?;
            self.emit(&produced, None, &mut out);
            for queue in &mut self.pending {
                queue.drain(..needed);
            }
        }

        Ok(Block::new(out, self.channels, 0))
    }

    /// Push the queued remainder and the resampler's tail through.
    pub(crate) fn flush(&mut self) -> Result<Block, CollageError> {
        let expected = (self.frames_in as f64 * self.ratio).round() as u64;
        let mut out = Vec::new();

        if !self.pending[0].is_empty() {
            let produced = self.resampler.process_partial(Some(self.pending.as_slice()), None)?;
            self.emit(&produced, Some(expected), &mut out);
            for queue in &mut self.pending {
                queue.clear();
            }
        }

        // A zero-input call can return nothing while the delay drains.
        let missing = self.delay as u64 + expected.saturating_sub(self.frames_out);
        let per_call = (self.chunk as f64 * self.ratio).max(f64::MIN_POSITIVE);
        let max_calls = (missing as f64 / per_call).ceil() as usize + 4;
        for _ in 0..max_calls {
            if self.frames_out >= expected {
                break;
            }
            let produced = self
                .resampler
                .process_partial(None::<&[Vec<f32>]>, None)?;
            self.emit(&produced, Some(expected), &mut out);
        }

        Ok(Block::new(out, self.channels, 0))
    }

    fn emit(&mut self, produced: &[Vec<f32>], limit: Option<u64>, out: &mut Vec<f32>) {
        let frames = produced.first().map_or(0, Vec::len);
        let skip = self.delay.min(frames);
        self.delay -= skip;

        for frame in skip..frames {
            if limit.is_some_and(|limit| self.frames_out >= limit) {
                break;
            }
            out.extend(produced.iter().map(|channel| channel[frame]));
            self.frames_out += 1;
        }
    }
}
