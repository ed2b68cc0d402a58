//! Real-time playback of compiled MIDI bytes.
//!
//! The compiler stays pure; this module owns the only concurrent actor:
//! a worker thread that paces raw MIDI messages to a [`MidiSink`].

#[cfg(feature = "player")]
pub mod output;
pub mod schedule;
pub mod session;

#[cfg(feature = "player")]
pub use output::MidirOutput;
pub use schedule::Schedule;
pub use session::Player;

use crate::error::PlayerError;

/// Destination for raw MIDI message bytes.
///
/// Implemented by the midir-backed device output; tests substitute a
/// capturing mock.
pub trait MidiSink: Send {
    fn send(&mut self, message: &[u8]) -> Result<(), PlayerError>;
}

/// MIDI status bytes and controller numbers used on the playback path.
pub mod messages {
    // Channel voice status (upper nibble; lower nibble is the channel)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const POLY_AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const CHANNEL_AFTERTOUCH: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;

    // Control change numbers
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const ALL_NOTES_OFF: u8 = 123;
}
