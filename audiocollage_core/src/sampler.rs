use std::path::Path;

use rand::Rng;

use crate::Corpus;

/// One sampling draw: a corpus member and an offset into it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRequest<'a> {
    pub path: &'a Path,
    pub offset_seconds: f64,
}

/// Draw a duration-weighted `(path, offset)` pair from `corpus`.
///
/// A point is chosen uniformly on the concatenated timeline of all entries, so
/// each entry is picked with probability `duration / total`. Returns `None`
/// when the corpus is empty.
pub fn sample<'a, R: Rng + ?Sized>(corpus: &'a Corpus, rng: &mut R) -> Option<SampleRequest<'a>> {
    if corpus.is_empty() {
        return None;
    }
    let point = rng.gen::<f64>() * corpus.total_duration();
    let (index, offset_seconds) = locate(corpus, point);

    Some(SampleRequest {
        path: &corpus.entries()[index].path,
        offset_seconds,
    })
}

/// Map a point on the concatenated timeline to an entry index and a local offset.
///
/// Points at or beyond the total duration resolve to the last entry.
fn locate(corpus: &Corpus, point: f64) -> (usize, f64) {
    let cumulative = corpus.cumulative();
    let last = cumulative.len().saturating_sub(1);

    let index = cumulative.partition_point(|&end| end <= point).min(last);
    let preceding = if index == 0 { 0.0 } else { cumulative[index - 1] };
    let duration = corpus.entries()[index].duration_seconds;

    (index, clamp_offset(point - preceding, duration))
}

fn clamp_offset(offset: f64, duration: f64) -> f64 {
    if offset < 0.0 || duration <= 0.0 {
        0.0
    } else if offset >= duration {
        // Largest representable value below `duration`.
        f64::from_bits(duration.to_bits() - 1).max(0.0)
    } else {
        offset
    }
}
