use super::messages;
use crate::error::PlayerError;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

/// One message at an absolute tick position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledMessage {
    pub tick: u64,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// Raw channel voice bytes, forwarded to the sink as-is.
    Channel(Vec<u8>),
    /// New tempo in microseconds per quarter note; rescales pacing from
    /// this tick onward and is never forwarded to the sink.
    Tempo(u32),
}

/// A playable schedule: all tracks of an SMF merged into one list of
/// messages in absolute-tick order. Ties keep track order, so track 0's
/// tempo map applies before any voice message at the same tick.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub ticks_per_quarter: u16,
    pub messages: Vec<ScheduledMessage>,
}

impl Schedule {
    pub fn parse(midi_bytes: &[u8]) -> Result<Self, PlayerError> {
        let smf = Smf::parse(midi_bytes).map_err(|e| PlayerError::InvalidMidi(e.to_string()))?;

        let ticks_per_quarter = match smf.header.timing {
            Timing::Metrical(tpq) => tpq.as_int(),
            Timing::Timecode(..) => {
                return Err(PlayerError::InvalidMidi(
                    "SMPTE timecode timing is not supported".to_string(),
                ));
            }
        };

        let mut messages = Vec::new();
        for track in &smf.tracks {
            let mut tick: u64 = 0;
            for event in track {
                tick += event.delta.as_int() as u64;
                match event.kind {
                    TrackEventKind::Midi { channel, message } => {
                        messages.push(ScheduledMessage {
                            tick,
                            kind: MessageKind::Channel(channel_message_bytes(
                                channel.as_int(),
                                &message,
                            )),
                        });
                    }
                    TrackEventKind::Meta(MetaMessage::Tempo(us)) => {
                        messages.push(ScheduledMessage {
                            tick,
                            kind: MessageKind::Tempo(us.as_int()),
                        });
                    }
                    // Other metas and sysex are file-level bookkeeping,
                    // nothing a live sink should receive.
                    _ => {}
                }
            }
        }

        // Stable sort keeps per-track (and track 0 first) order on ties.
        messages.sort_by_key(|m| m.tick);

        Ok(Self {
            ticks_per_quarter,
            messages,
        })
    }
}

fn channel_message_bytes(channel: u8, message: &MidiMessage) -> Vec<u8> {
    match *message {
        MidiMessage::NoteOff { key, vel } => {
            vec![messages::NOTE_OFF | channel, key.as_int(), vel.as_int()]
        }
        MidiMessage::NoteOn { key, vel } => {
            vec![messages::NOTE_ON | channel, key.as_int(), vel.as_int()]
        }
        MidiMessage::Aftertouch { key, vel } => {
            vec![messages::POLY_AFTERTOUCH | channel, key.as_int(), vel.as_int()]
        }
        MidiMessage::Controller { controller, value } => {
            vec![
                messages::CONTROL_CHANGE | channel,
                controller.as_int(),
                value.as_int(),
            ]
        }
        MidiMessage::ProgramChange { program } => {
            vec![messages::PROGRAM_CHANGE | channel, program.as_int()]
        }
        MidiMessage::ChannelAftertouch { vel } => {
            vec![messages::CHANNEL_AFTERTOUCH | channel, vel.as_int()]
        }
        MidiMessage::PitchBend { bend } => {
            let raw = bend.0.as_int();
            vec![
                messages::PITCH_BEND | channel,
                (raw & 0x7F) as u8,
                (raw >> 7) as u8,
            ]
        }
    }
}
