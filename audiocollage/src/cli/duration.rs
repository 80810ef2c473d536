use std::fmt;
use std::time::Duration;

/// Parse a clip length into a [`Duration`].
///
/// A bare number is a count of seconds (`"1"`, `"0.25"`). Otherwise the value
/// is one or more `<number><unit>` components with units `ms`, `s`, `m` and
/// `h`, optionally separated by whitespace or underscores (`"1m30s"`,
/// `"1s 500ms"`). The total must be finite and greater than zero.
pub fn parse_clip_length(value: &str) -> Result<Duration, LengthParseError> {
    let input = value.trim();
    if input.is_empty() {
        return Err(LengthParseError::Empty);
    }

    if let Ok(seconds) = input.parse::<f64>() {
        return seconds_to_duration(seconds);
    }

    let bytes = input.as_bytes();
    let mut index = 0;
    let mut total = 0.0f64;

    while index < bytes.len() {
        if matches!(bytes[index], b'_') || bytes[index].is_ascii_whitespace() {
            index += 1;
            continue;
        }

        let start = index;
        while index < bytes.len() && (bytes[index].is_ascii_digit() || bytes[index] == b'.') {
            index += 1;
        }
        if start == index {
            return Err(LengthParseError::ExpectedNumber { index: start });
        }
        let number: f64 = input[start..index]
            .parse()
            .map_err(|_| LengthParseError::InvalidNumber {
                found: input[start..index].to_owned(),
            })?;

        let unit_start = index;
        while index < bytes.len() && bytes[index].is_ascii_alphabetic() {
            index += 1;
        }
        let factor = match &input[unit_start..index] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "" => return Err(LengthParseError::ExpectedUnit { index: unit_start }),
            other => {
                return Err(LengthParseError::UnknownUnit {
                    found: other.to_owned(),
                })
            }
        };

        total += number * factor;
    }

    seconds_to_duration(total)
}

fn seconds_to_duration(seconds: f64) -> Result<Duration, LengthParseError> {
    if seconds.is_nan() || seconds < 0.0 {
        return Err(LengthParseError::Negative);
    }
    if seconds == 0.0 {
        return Err(LengthParseError::Zero);
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| LengthParseError::TooLarge)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthParseError {
    Empty,
    ExpectedNumber { index: usize },
    ExpectedUnit { index: usize },
    InvalidNumber { found: String },
    UnknownUnit { found: String },
    Negative,
    Zero,
    TooLarge,
}

impl std::error::Error for LengthParseError {}

impl fmt::Display for LengthParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthParseError::Empty => write!(f, "clip length cannot be empty"),
            LengthParseError::ExpectedNumber { index } => {
                write!(f, "expected a number at position {}", index + 1)
            }
            LengthParseError::ExpectedUnit { index } => {
                write!(f, "expected a unit at position {}", index + 1)
            }
            LengthParseError::InvalidNumber { found } => write!(f, "invalid number '{found}'"),
            LengthParseError::UnknownUnit { found } => {
                write!(f, "unknown unit '{found}' (use ms, s, m or h)")
            }
            LengthParseError::Negative => write!(f, "clip length cannot be negative"),
            LengthParseError::Zero => write!(f, "clip length must be greater than zero"),
            LengthParseError::TooLarge => write!(f, "clip length is too large"),
        }
    }
}
