//! Decoding side of the audio backend.
//!
//! Everything that touches Symphonia lives here: probing candidate files for
//! the corpus, and opening a seekable, decodable stream for the clip pipeline.

use std::fs::File;
use std::io;
use std::path::Path;

use log::debug;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{
    CodecParameters, CodecRegistry, Decoder, DecoderOptions, CODEC_TYPE_NULL,
};
use symphonia::core::errors::{Error as SymphoniaError, SeekErrorKind};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, Probe};
use symphonia::core::units::{Time, TimeBase};
use symphonia::default::{get_codecs, get_probe};

use crate::{CollageError, ProbeError, SignalDescriptor, SourceInfo};

/// Anything that can report the signal format and length of a file.
pub trait SignalProbe {
    fn probe(&self, path: &Path) -> Result<SourceInfo, ProbeError>;
}

/// Process-wide decoding state: the codec registry and the format probe.
///
/// Create one per run, before scanning the corpus, and share it by reference.
pub struct AudioBackend {
    codecs: &'static CodecRegistry,
    formats: &'static Probe,
}

impl AudioBackend {
    pub fn new() -> Self {
        debug!("initialising audio backend");
        Self {
            codecs: get_codecs(),
            formats: get_probe(),
        }
    }

    fn open_format(&self, path: &Path) -> Result<(Box<dyn FormatReader>, bool), SymphoniaError> {
        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let file = File::open(path)?;
        let seekable = file.is_seekable();
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let probed = self.formats.format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;

        Ok((probed.format, seekable))
    }

    /// Open `path` for streaming decode of its default track.
    pub fn open_read(&self, path: &Path) -> Result<SourceStream, CollageError> {
        let open_error = |source| CollageError::OpenSource {
            path: path.to_path_buf(),
            source,
        };

        let (reader, _) = self.open_format(path).map_err(open_error)?;
        let track = reader
            .default_track()
            .ok_or_else(|| open_error(SymphoniaError::Unsupported("no default track")))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let decoder = self
            .codecs
            .make(&params, &DecoderOptions::default())
            .map_err(open_error)?;

        Ok(SourceStream {
            reader,
            decoder,
            track_id,
            time_base: params.time_base,
            signal: signal_of(&params),
            frames: params.n_frames,
            buffer: None,
        })
    }
}

impl Default for AudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioBackend {
    fn drop(&mut self) {
        debug!("audio backend released");
    }
}

impl SignalProbe for AudioBackend {
    fn probe(&self, path: &Path) -> Result<SourceInfo, ProbeError> {
        let (reader, seekable) = self.open_format(path)?;
        let track = reader
            .default_track()
            .ok_or(ProbeError::MissingDefaultTrack)?;
        let params = &track.codec_params;
        if params.codec == CODEC_TYPE_NULL {
            return Err(ProbeError::MissingDefaultTrack);
        }
        if self.codecs.get_codec(params.codec).is_none() {
            return Err(ProbeError::UnsupportedCodec);
        }

        let signal = signal_of(params);
        let length = params.n_frames.unwrap_or(0) * u64::from(signal.channels);

        Ok(SourceInfo {
            signal,
            length,
            seekable,
        })
    }
}

fn signal_of(params: &CodecParameters) -> SignalDescriptor {
    let channels = params
        .channels
        .map_or(0, |channels| channels.count().min(usize::from(u16::MAX)) as u16);
    let bit_depth = params
        .bits_per_sample
        .or(params.bits_per_coded_sample)
        .unwrap_or(0)
        .min(u32::from(u16::MAX)) as u16;

    SignalDescriptor::new(params.sample_rate.unwrap_or(0), channels, bit_depth)
}

/// Where a [`SourceStream`] ended up after [`SourceStream::seek_to_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekOutcome {
    /// Positioned at or shortly before the requested frame.
    Positioned,
    /// The container cannot seek; decoding continues from the current position.
    Unsupported,
    /// The requested frame lies beyond the end of the stream.
    PastEnd,
}

/// Decoded samples together with the source frame index of their first frame.
#[derive(Debug)]
pub struct DecodedChunk<'a> {
    pub position: u64,
    pub samples: &'a [f32],
}

/// An open source file, decoding its default track to interleaved `f32`.
pub struct SourceStream {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    time_base: Option<TimeBase>,
    signal: SignalDescriptor,
    frames: Option<u64>,
    buffer: Option<(SampleBuffer<f32>, SignalSpec, u64)>,
}

impl SourceStream {
    pub fn signal(&self) -> SignalDescriptor {
        self.signal
    }

    /// Total frames in the track, when the container reports it.
    pub fn frames(&self) -> Option<u64> {
        self.frames
    }

    pub fn seek_to_frame(&mut self, frame: u64) -> Result<SeekOutcome, CollageError> {
        let ts = self.frame_to_ts(frame);
        let seek = self.reader.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts,
                track_id: self.track_id,
            },
        );

        match seek {
            Ok(_) => {
                self.decoder.reset();
                Ok(SeekOutcome::Positioned)
            }
            Err(SymphoniaError::SeekError(SeekErrorKind::OutOfRange)) => Ok(SeekOutcome::PastEnd),
            Err(SymphoniaError::SeekError(
                SeekErrorKind::Unseekable | SeekErrorKind::ForwardOnly,
            )) => Ok(SeekOutcome::Unsupported),
            Err(err) => Err(err.into()),
        }
    }

    /// Decode the next packet of the track. Returns `None` at end of stream.
    pub fn next_chunk(&mut self) -> Result<Option<DecodedChunk<'_>>, CollageError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => return Ok(None),
                Err(err) => return Err(err.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }
            let position = self.ts_to_frame(packet.ts());

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(err)) => {
                    debug!("skipping undecodable packet: {err}");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            if decoded.frames() == 0 {
                continue;
            }

            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            let (mut buffer, buffer_spec, buffer_frames) = match self.buffer.take() {
                Some((buffer, buffer_spec, frames))
                    if buffer_spec == spec && frames >= capacity =>
                {
                    (buffer, buffer_spec, frames)
                }
                _ => (SampleBuffer::new(capacity, spec), spec, capacity),
            };
            buffer.copy_interleaved_ref(decoded);

            let (buffer, _, _) = self.buffer.insert((buffer, buffer_spec, buffer_frames));
            return Ok(Some(DecodedChunk {
                position,
                samples: buffer.samples(),
            }));
        }
    }

    fn native_time_base(&self) -> Option<TimeBase> {
        self.time_base
            .filter(|tb| !(tb.numer == 1 && tb.denom == self.signal.sample_rate))
    }

    fn ts_to_frame(&self, ts: u64) -> u64 {
        match self.native_time_base() {
            Some(tb) => {
                let time = tb.calc_time(ts);
                ((time.seconds as f64 + time.frac) * f64::from(self.signal.sample_rate)).round()
                    as u64
            }
            None => ts,
        }
    }

    fn frame_to_ts(&self, frame: u64) -> u64 {
        match self.native_time_base() {
            Some(tb) if self.signal.sample_rate > 0 => {
                let rate = u64::from(self.signal.sample_rate);
                let time = Time::new(frame / rate, (frame % rate) as f64 / rate as f64);
                tb.calc_timestamp(time)
            }
            _ => frame,
        }
    }
}
