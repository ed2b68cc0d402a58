use crate::types::pitch::Pitch;
use thiserror::Error;

/// Syntax failure while scanning MML text.
///
/// Offsets are zero-based character positions in the *normalized* input
/// (whitespace stripped, upper-cased), matching what the scanner actually
/// walked over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("unknown MML command '{ch}' at position {offset}")]
    UnknownCommand { ch: char, offset: usize },

    #[error("'{command}' requires a digit at position {offset}")]
    MissingDigit { command: char, offset: usize },

    #[error("number at position {offset} must be a positive integer")]
    BadNumber { offset: usize },
}

impl SyntaxError {
    /// Zero-based offset in the normalized text.
    pub fn offset(&self) -> usize {
        match self {
            SyntaxError::UnknownCommand { offset, .. }
            | SyntaxError::MissingDigit { offset, .. }
            | SyntaxError::BadNumber { offset } => *offset,
        }
    }
}

/// Failure while turning musical events into MIDI bytes. The whole emit
/// call fails atomically; no partial buffer is ever returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("pitch {pitch} is outside the MIDI note range 0-127")]
    PitchOutOfRange { pitch: Pitch },

    #[error("duration of {quarter_length} quarter notes rounds to zero ticks")]
    NonPositiveDuration { quarter_length: f64 },

    #[error("duration of {quarter_length} quarter notes exceeds the MIDI delta-time range")]
    DurationTooLong { quarter_length: f64 },

    #[error("tempo {bpm} BPM does not fit the MIDI tempo field")]
    TempoOutOfRange { bpm: u32 },

    #[error("resolution {ticks_per_quarter} exceeds the 15-bit MIDI header field")]
    ResolutionOutOfRange { ticks_per_quarter: u16 },

    #[error("failed to write MIDI bytes: {0}")]
    Write(String),
}

/// Error from a full compile call (parse + emit).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Track numbers are 1-based, matching the track names in the output.
    #[error("syntax error in track {track}: {source}")]
    Syntax {
        track: usize,
        #[source]
        source: SyntaxError,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Error from the playback path (device selection, connection, send).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    #[error("no MIDI output device matching '{0}'")]
    DeviceNotFound(String),

    #[error("no MIDI output ports available")]
    NoOutputPorts,

    #[error("MIDI output initialization failed: {0}")]
    Init(String),

    #[error("failed to connect to MIDI output: {0}")]
    Connect(String),

    #[error("failed to send MIDI message: {0}")]
    Send(String),

    #[error("invalid MIDI data: {0}")]
    InvalidMidi(String),
}
