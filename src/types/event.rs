use crate::types::pitch::Pitch;
use std::fmt;

/// One event in a parsed MML sequence, in source order.
///
/// Durations are expressed in quarter notes (1.0 = quarter, 0.5 = eighth,
/// 1.5 = dotted quarter), independent of any tempo or tick resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum MmlEvent {
    Note { pitch: Pitch, quarter_length: f64 },
    Rest { quarter_length: f64 },
    Tempo { bpm: u32 },
}

impl MmlEvent {
    /// Duration in quarter notes. Tempo markers take no time.
    pub fn quarter_length(&self) -> f64 {
        match self {
            MmlEvent::Note { quarter_length, .. } | MmlEvent::Rest { quarter_length } => {
                *quarter_length
            }
            MmlEvent::Tempo { .. } => 0.0,
        }
    }
}

impl fmt::Display for MmlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MmlEvent::Note {
                pitch,
                quarter_length,
            } => {
                write!(f, "note {} dur={}", pitch, quarter_length)
            }
            MmlEvent::Rest { quarter_length } => {
                write!(f, "rest dur={}", quarter_length)
            }
            MmlEvent::Tempo { bpm } => {
                write!(f, "tempo {}", bpm)
            }
        }
    }
}
