use std::path::PathBuf;

use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

/// Reasons a candidate file is rejected while building the corpus.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The file could not be opened or its container was not recognised.
    #[error("failed to open input file: {0}")]
    Open(#[from] SymphoniaError),

    /// The container opened but exposes no decodable default track.
    #[error("no decodable default track")]
    MissingDefaultTrack,

    /// No registered decoder handles the track's codec.
    #[error("unsupported codec")]
    UnsupportedCodec,

    /// The underlying source does not support seeking.
    #[error("not seekable")]
    NotSeekable,

    /// The track reports no channels.
    #[error("can't read channel count")]
    InvalidChannels,

    /// The track reports no sample rate.
    #[error("can't read file rate")]
    InvalidSampleRate,

    /// The track reports no frames, or its length is unknown.
    #[error("can't read file length")]
    InvalidLength,
}

/// Errors that can occur while building an audio collage.
#[derive(Debug, Error)]
pub enum CollageError {
    /// A single file failed to probe. Scans skip these; direct callers of
    /// [`crate::Corpus::add_path`] see them.
    #[error("failed to probe '{path}'")]
    Probe {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },

    /// A source file could not be opened for streaming.
    #[error("failed to open source '{path}'")]
    OpenSource {
        path: PathBuf,
        #[source]
        source: SymphoniaError,
    },

    /// The destination could not be created.
    #[error("failed to open destination '{path}'")]
    OpenDestination {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// The directory walk itself failed.
    #[error("failed to scan corpus directory")]
    Walk(#[from] walkdir::Error),

    /// Wrapper around errors produced by the Symphonia decoding library.
    #[error(transparent)]
    Symphonia(#[from] SymphoniaError),

    /// Wrapper around errors produced while encoding the WAV output.
    #[error(transparent)]
    Wav(#[from] hound::Error),

    /// Sample-rate conversion failed while processing a clip.
    #[error(transparent)]
    Resample(#[from] rubato::ResampleError),

    /// The resampler for a source/target rate pair could not be built.
    #[error(transparent)]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    /// Wrapper around IO errors encountered while reading or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Clips were requested but no usable source file was found.
    #[error("corpus is empty: no usable audio files were found")]
    EmptyCorpus,

    /// The configured clip length is zero.
    #[error("clip length must be greater than zero")]
    InvalidClipLength,

    /// The output signal cannot be encoded as WAV.
    #[error("invalid output signal: {0}")]
    InvalidSignal(String),

    /// The input directory is missing or is not a directory.
    #[error("input directory does not exist: {0}")]
    MissingInputDirectory(PathBuf),
}
