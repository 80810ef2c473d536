use std::fmt;

use crate::CollageError;

/// Format of an audio stream: sample rate, channel count and bit depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignalDescriptor {
    pub sample_rate: u32,
    pub channels: u16,
    /// Bits per sample. Sources whose codec does not advertise a depth report 0.
    pub bit_depth: u16,
}

impl SignalDescriptor {
    /// The fixed output format: 44.1 kHz, stereo, 16 bit.
    pub const CD_QUALITY: Self = Self::new(44_100, 2, 16);

    pub const fn new(sample_rate: u32, channels: u16, bit_depth: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bit_depth,
        }
    }

    /// Check that the descriptor can be written as integer PCM WAV.
    pub fn validate_output(&self) -> Result<(), CollageError> {
        if self.sample_rate == 0 {
            return Err(CollageError::InvalidSignal(
                "sample rate must be greater than zero".into(),
            ));
        }
        if self.channels == 0 {
            return Err(CollageError::InvalidSignal(
                "channel count must be greater than zero".into(),
            ));
        }
        if !matches!(self.bit_depth, 8 | 16 | 24 | 32) {
            return Err(CollageError::InvalidSignal(format!(
                "unsupported bit depth {}",
                self.bit_depth
            )));
        }
        Ok(())
    }

    pub(crate) fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

impl Default for SignalDescriptor {
    fn default() -> Self {
        Self::CD_QUALITY
    }
}

impl fmt::Display for SignalDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {} bit",
            self.sample_rate, self.channels, self.bit_depth
        )
    }
}

/// What a probe learns about a candidate source file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceInfo {
    pub signal: SignalDescriptor,
    /// Total interleaved samples (frames times channels).
    pub length: u64,
    pub seekable: bool,
}
