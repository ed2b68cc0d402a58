use crate::error::CompileError;
use crate::midi::{events_to_midi, tracks_to_midi};
use crate::parser::parse_mml;

/// Compile one MML string into a single-track (format 0) MIDI file.
pub fn compile_single_track(
    text: &str,
    ticks_per_quarter: u16,
) -> Result<Vec<u8>, CompileError> {
    let events = parse_mml(text).map_err(|source| CompileError::Syntax { track: 1, source })?;
    Ok(events_to_midi(&events, ticks_per_quarter)?)
}

/// Compile one MML string per track into a multi-track (format 1) MIDI
/// file. Syntax errors report the 1-based number of the offending track.
pub fn compile_multi_track<S: AsRef<str>>(
    texts: &[S],
    ticks_per_quarter: u16,
) -> Result<Vec<u8>, CompileError> {
    let mut tracks = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        let events = parse_mml(text.as_ref())
            .map_err(|source| CompileError::Syntax { track: i + 1, source })?;
        tracks.push(events);
    }

    Ok(tracks_to_midi(&tracks, ticks_per_quarter)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;
    use crate::midi::DEFAULT_TICKS_PER_QUARTER;
    use midly::{MetaMessage, Smf, TrackEventKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_track_framing() {
        let bytes = compile_single_track("CDEFGAB", DEFAULT_TICKS_PER_QUARTER).unwrap();
        assert_eq!(&bytes[0..4], b"MThd");
        assert!(bytes.len() > 14);
    }

    #[test]
    fn test_single_track_syntax_error() {
        let err = compile_single_track("CDEFGABX", DEFAULT_TICKS_PER_QUARTER).unwrap_err();
        assert_eq!(
            err,
            CompileError::Syntax {
                track: 1,
                source: SyntaxError::UnknownCommand { ch: 'X', offset: 7 },
            }
        );
    }

    #[test]
    fn test_multi_track_tempo_policy() {
        let bytes =
            compile_multi_track(&["T100CDE", "T200EFG"], DEFAULT_TICKS_PER_QUARTER).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 2);

        // 100 BPM from track 0 is the only tempo meta in the file.
        let track0_tempos: Vec<u32> = smf.tracks[0]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(us)) => Some(us.as_int()),
                _ => None,
            })
            .collect();
        assert_eq!(track0_tempos, vec![500_000, 600_000]);

        let track1_has_tempo = smf.tracks[1]
            .iter()
            .any(|e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::Tempo(_))));
        assert!(!track1_has_tempo);
    }

    #[test]
    fn test_multi_track_error_names_offending_track() {
        let err =
            compile_multi_track(&["CDE", "EF?"], DEFAULT_TICKS_PER_QUARTER).unwrap_err();
        assert_eq!(
            err,
            CompileError::Syntax {
                track: 2,
                source: SyntaxError::UnknownCommand { ch: '?', offset: 2 },
            }
        );
    }

    #[test]
    fn test_encode_error_propagates() {
        let err = compile_single_track("O9A", DEFAULT_TICKS_PER_QUARTER).unwrap_err();
        assert!(matches!(err, CompileError::Encode(_)));
    }

    #[test]
    fn test_empty_multi_track_list() {
        let bytes =
            compile_multi_track::<&str>(&[], DEFAULT_TICKS_PER_QUARTER).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 0);
    }
}
