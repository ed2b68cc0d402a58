//! mmlc - MML to MIDI compiler
//!
//! Compiles Music Macro Language (MML) text - pitch letters with
//! octave/length/tempo modifiers and rests - into standard MIDI files,
//! and optionally streams the result to a live MIDI output device.

pub mod error;
pub mod parser;
pub mod types;

#[cfg(feature = "midi")]
pub mod compile;
#[cfg(feature = "midi")]
pub mod midi;
#[cfg(feature = "midi")]
pub mod player;

// Re-export commonly used types
pub use error::{CompileError, EncodeError, PlayerError, SyntaxError};
pub use parser::{parse_mml, validate_mml};
pub use types::event::MmlEvent;
pub use types::pitch::{Accidental, Pitch, PitchLetter};

#[cfg(feature = "midi")]
pub use compile::{compile_multi_track, compile_single_track};
#[cfg(feature = "midi")]
pub use midi::{DEFAULT_TICKS_PER_QUARTER, MAX_TICKS_PER_QUARTER, events_to_midi, tracks_to_midi};
#[cfg(feature = "midi")]
pub use player::{MidiSink, Player};
#[cfg(feature = "player")]
pub use player::MidirOutput;
