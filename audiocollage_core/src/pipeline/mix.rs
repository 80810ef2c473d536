use super::Block;

/// Converts interleaved audio between channel counts.
///
/// Narrowing averages every input channel into the output channel it is
/// congruent to (modulo the output count), so N to 1 is a plain average.
/// Widening copies input channel `j % from` into output channel `j`, so 1 to N
/// duplicates the mono signal.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChannelMixer {
    from: usize,
    to: usize,
}

impl ChannelMixer {
    pub(crate) fn new(from: usize, to: usize) -> Self {
        debug_assert!(from > 0 && to > 0);
        Self { from, to }
    }

    pub(crate) fn process(&self, block: Block) -> Block {
        debug_assert_eq!(block.channels, self.from);
        let frames = block.frames();
        let mut out = Vec::with_capacity(frames * self.to);

        for frame in block.samples.chunks_exact(self.from) {
            if self.to < self.from {
                for target in 0..self.to {
                    let (sum, count) = frame
                        .iter()
                        .skip(target)
                        .step_by(self.to)
                        .fold((0.0f32, 0u32), |(sum, count), &s| (sum + s, count + 1));
                    out.push(sum / count as f32);
                }
            } else {
                out.extend((0..self.to).map(|target| frame[target % self.from]));
            }
        }

        Block::new(out, self.to, block.position)
    }
}
