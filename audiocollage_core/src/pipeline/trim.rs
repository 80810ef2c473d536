use super::Block;

/// Keeps only the source frames in `[start, end)`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TrimWindow {
    start: u64,
    end: u64,
    exhausted: bool,
}

impl TrimWindow {
    pub(crate) fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            exhausted: start >= end,
        }
    }

    pub(crate) fn process(&mut self, block: Block) -> Block {
        let channels = block.channels;
        let first = block.position;
        let last = first + block.frames() as u64;
        if last >= self.end {
            self.exhausted = true;
        }

        let keep_from = self.start.clamp(first, last);
        let keep_to = self.end.clamp(first, last);
        if keep_from >= keep_to {
            return Block::new(Vec::new(), channels, keep_from);
        }

        let lo = (keep_from - first) as usize * channels;
        let hi = (keep_to - first) as usize * channels;
        let mut samples = block.samples;
        samples.truncate(hi);
        samples.drain(..lo);

        Block::new(samples, channels, keep_from)
    }

    /// True once a block reaching the window end has been seen.
    pub(crate) fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
