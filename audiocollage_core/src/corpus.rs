use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use walkdir::WalkDir;

use crate::io::SignalProbe;
use crate::{CollageError, ProbeError, SourceInfo};

/// A usable source file and its probed duration.
#[derive(Clone, Debug, PartialEq)]
pub struct CorpusEntry {
    pub path: PathBuf,
    pub duration_seconds: f64,
}

/// The weighted sampling population: every usable source file, in discovery order.
///
/// Entries are only ever appended. `cumulative[i]` holds the summed duration of
/// entries `0..=i`, so the last element always equals the total.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    cumulative: Vec<f64>,
    total_duration: f64,
}

/// Outcome of a directory scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub accepted: usize,
    pub skipped: usize,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `path` and append it to the corpus.
    ///
    /// Files that cannot be opened, are not seekable, or report a channel count,
    /// sample rate or length below one are rejected and leave the corpus
    /// untouched.
    pub fn add_path<P: SignalProbe + ?Sized>(
        &mut self,
        path: &Path,
        probe: &P,
    ) -> Result<&CorpusEntry, CollageError> {
        let duration_seconds = probe
            .probe(path)
            .and_then(|info| duration_of(&info))
            .map_err(|source| CollageError::Probe {
                path: path.to_path_buf(),
                source,
            })?;

        self.total_duration += duration_seconds;
        self.cumulative.push(self.total_duration);
        self.entries.push(CorpusEntry {
            path: path.to_path_buf(),
            duration_seconds,
        });

        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Recursively offer every file below `root` to [`Corpus::add_path`].
    ///
    /// Files that fail to probe are skipped. A failure of the walk itself aborts
    /// the scan. `exclude` is never probed; pass the output path here.
    pub fn scan<P: SignalProbe + ?Sized>(
        &mut self,
        root: &Path,
        probe: &P,
        exclude: Option<&Path>,
    ) -> Result<ScanReport, CollageError> {
        let mut report = ScanReport::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if exclude.is_some_and(|excluded| is_same_file(path, excluded)) {
                debug!("not sampling output file '{}'", path.display());
                continue;
            }

            match self.add_path(path, probe) {
                Ok(added) => {
                    debug!(
                        "added '{}' ({:.3}s)",
                        added.path.display(),
                        added.duration_seconds
                    );
                    report.accepted += 1;
                }
                Err(err) => {
                    let reason = match &err {
                        CollageError::Probe { source, .. } => source.to_string(),
                        other => other.to_string(),
                    };
                    debug!("skipping '{}': {reason}", path.display());
                    report.skipped += 1;
                }
            }
        }

        info!(
            "corpus: {} file(s), {:.3}s total, {} skipped",
            report.accepted, self.total_duration, report.skipped
        );
        Ok(report)
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every entry's duration, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub(crate) fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn total_duration_as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_duration.max(0.0))
    }
}

fn duration_of(info: &SourceInfo) -> Result<f64, ProbeError> {
    if !info.seekable {
        return Err(ProbeError::NotSeekable);
    }
    if info.signal.channels < 1 {
        return Err(ProbeError::InvalidChannels);
    }
    if info.signal.sample_rate < 1 {
        return Err(ProbeError::InvalidSampleRate);
    }
    if info.length < 1 {
        return Err(ProbeError::InvalidLength);
    }

    Ok(info.length as f64 / f64::from(info.signal.channels) / f64::from(info.signal.sample_rate))
}

fn is_same_file(candidate: &Path, excluded: &Path) -> bool {
    if candidate == excluded {
        return true;
    }
    match (candidate.canonicalize(), excluded.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
