use crate::error::EncodeError;
use crate::types::event::MmlEvent;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

pub const DEFAULT_TICKS_PER_QUARTER: u16 = 480;

/// Largest resolution the SMF header can record (15 bits).
pub const MAX_TICKS_PER_QUARTER: u16 = (1 << 15) - 1;

/// Fixed note velocity; MML carries no dynamics.
const NOTE_VELOCITY: u8 = 64;

/// Largest delta-time a track event can carry (28-bit VLQ).
const MAX_DELTA_TICKS: u64 = (1 << 28) - 1;

/// Largest tempo value the set_tempo meta can carry (24 bits).
const MAX_TEMPO_MICROS: u32 = (1 << 24) - 1;

/// Encode one event sequence as a single-track (format 0) MIDI file.
pub fn events_to_midi(
    events: &[MmlEvent],
    ticks_per_quarter: u16,
) -> Result<Vec<u8>, EncodeError> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        metrical_timing(ticks_per_quarter)?,
    ));

    let mut track = Track::new();
    append_events(&mut track, events, 0, true, ticks_per_quarter)?;
    finish_track(&mut track);
    smf.tracks.push(track);

    write_smf(&smf)
}

/// Encode multiple event sequences as a multi-track (format 1) MIDI file,
/// one track chunk per sequence.
///
/// Track `i` uses channel `i % 16` and opens with a `"Track {i+1}"` name
/// meta. Tempo events become `set_tempo` messages only on track 0; other
/// tracks consume them silently, keeping a single authoritative tempo map.
pub fn tracks_to_midi(
    event_tracks: &[Vec<MmlEvent>],
    ticks_per_quarter: u16,
) -> Result<Vec<u8>, EncodeError> {
    let names: Vec<String> = (0..event_tracks.len())
        .map(|i| format!("Track {}", i + 1))
        .collect();

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        metrical_timing(ticks_per_quarter)?,
    ));

    for (i, events) in event_tracks.iter().enumerate() {
        let mut track = Track::new();
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(names[i].as_bytes())),
        });

        let channel = (i % 16) as u8;
        append_events(&mut track, events, channel, i == 0, ticks_per_quarter)?;
        finish_track(&mut track);
        smf.tracks.push(track);
    }

    write_smf(&smf)
}

/// Walk the events, accumulating rest time into the delta of the next
/// emitted message. Note-on carries the accumulated rest delta; note-off
/// carries the note's own duration, so notes sound for their full nominal
/// length and never overlap within one track.
fn append_events(
    track: &mut Track<'_>,
    events: &[MmlEvent],
    channel: u8,
    emit_tempo: bool,
    ticks_per_quarter: u16,
) -> Result<(), EncodeError> {
    let channel = u4::new(channel);
    let mut pending_delta: u64 = 0;

    for event in events {
        match event {
            MmlEvent::Note {
                pitch,
                quarter_length,
            } => {
                let key = pitch
                    .midi_number()
                    .ok_or(EncodeError::PitchOutOfRange { pitch: *pitch })?;
                let duration = duration_ticks(*quarter_length, ticks_per_quarter)?;

                track.push(TrackEvent {
                    delta: delta_time(pending_delta, *quarter_length)?,
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOn {
                            key: u7::new(key),
                            vel: u7::new(NOTE_VELOCITY),
                        },
                    },
                });
                track.push(TrackEvent {
                    delta: delta_time(duration, *quarter_length)?,
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOff {
                            key: u7::new(key),
                            vel: u7::new(NOTE_VELOCITY),
                        },
                    },
                });
                pending_delta = 0;
            }
            MmlEvent::Rest { quarter_length } => {
                pending_delta += duration_ticks(*quarter_length, ticks_per_quarter)?;
            }
            MmlEvent::Tempo { bpm } => {
                if emit_tempo {
                    track.push(TrackEvent {
                        delta: delta_time(pending_delta, 0.0)?,
                        kind: TrackEventKind::Meta(MetaMessage::Tempo(
                            microseconds_per_quarter(*bpm)?,
                        )),
                    });
                    pending_delta = 0;
                }
            }
        }
    }

    Ok(())
}

/// The header's division field is 15 bits; `u15::new` would silently
/// mask anything larger, corrupting every delta in the file.
fn metrical_timing(ticks_per_quarter: u16) -> Result<Timing, EncodeError> {
    if ticks_per_quarter > MAX_TICKS_PER_QUARTER {
        return Err(EncodeError::ResolutionOutOfRange { ticks_per_quarter });
    }
    Ok(Timing::Metrical(u15::new(ticks_per_quarter)))
}

fn finish_track(track: &mut Track<'_>) {
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
}

fn write_smf(smf: &Smf<'_>) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    smf.write(&mut buffer)
        .map_err(|e| EncodeError::Write(e.to_string()))?;
    Ok(buffer)
}

fn duration_ticks(quarter_length: f64, ticks_per_quarter: u16) -> Result<u64, EncodeError> {
    let ticks = (quarter_length * ticks_per_quarter as f64).round();
    if ticks.is_nan() || ticks < 1.0 {
        return Err(EncodeError::NonPositiveDuration { quarter_length });
    }
    if ticks > MAX_DELTA_TICKS as f64 {
        return Err(EncodeError::DurationTooLong { quarter_length });
    }
    Ok(ticks as u64)
}

fn delta_time(ticks: u64, quarter_length: f64) -> Result<u28, EncodeError> {
    if ticks > MAX_DELTA_TICKS {
        return Err(EncodeError::DurationTooLong { quarter_length });
    }
    Ok(u28::new(ticks as u32))
}

fn microseconds_per_quarter(bpm: u32) -> Result<u24, EncodeError> {
    if bpm == 0 {
        return Err(EncodeError::TempoOutOfRange { bpm });
    }
    let micros = (60_000_000.0 / bpm as f64).round();
    if micros > MAX_TEMPO_MICROS as f64 {
        return Err(EncodeError::TempoOutOfRange { bpm });
    }
    Ok(u24::new(micros as u32))
}
