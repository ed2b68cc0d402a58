use std::fmt;

/// The seven diatonic note letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchLetter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl PitchLetter {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'C' => Some(PitchLetter::C),
            'D' => Some(PitchLetter::D),
            'E' => Some(PitchLetter::E),
            'F' => Some(PitchLetter::F),
            'G' => Some(PitchLetter::G),
            'A' => Some(PitchLetter::A),
            'B' => Some(PitchLetter::B),
            _ => None,
        }
    }

    /// Semitone offset from C within one octave.
    pub fn semitone(&self) -> u8 {
        match self {
            PitchLetter::C => 0,
            PitchLetter::D => 2,
            PitchLetter::E => 4,
            PitchLetter::F => 5,
            PitchLetter::G => 7,
            PitchLetter::A => 9,
            PitchLetter::B => 11,
        }
    }
}

impl fmt::Display for PitchLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            PitchLetter::C => 'C',
            PitchLetter::D => 'D',
            PitchLetter::E => 'E',
            PitchLetter::F => 'F',
            PitchLetter::G => 'G',
            PitchLetter::A => 'A',
            PitchLetter::B => 'B',
        };
        write!(f, "{}", letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    /// Semitone adjustment applied to the letter.
    pub fn offset(&self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }
}

impl fmt::Display for Accidental {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accidental::Natural => Ok(()),
            Accidental::Sharp => write!(f, "#"),
            Accidental::Flat => write!(f, "-"),
        }
    }
}

/// A note name as written: letter, accidental, and octave, without any
/// music-theoretic normalization (B# stays B#, it never becomes C of the
/// next octave).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    pub letter: PitchLetter,
    pub accidental: Accidental,
    pub octave: u8,
}

impl Pitch {
    pub fn new(letter: PitchLetter, accidental: Accidental, octave: u8) -> Self {
        Self {
            letter,
            accidental,
            octave,
        }
    }

    /// MIDI note number with C4 = 60. None when the pitch falls outside
    /// the representable 0-127 range.
    pub fn midi_number(&self) -> Option<u8> {
        let midi =
            (self.octave as i32 + 1) * 12 + self.letter.semitone() as i32 + self.accidental.offset();

        if (0..=127).contains(&midi) {
            Some(midi as u8)
        } else {
            None
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.letter, self.accidental, self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c() {
        let pitch = Pitch::new(PitchLetter::C, Accidental::Natural, 4);
        assert_eq!(pitch.midi_number(), Some(60));
    }

    #[test]
    fn test_accidentals() {
        let sharp = Pitch::new(PitchLetter::C, Accidental::Sharp, 4);
        assert_eq!(sharp.midi_number(), Some(61));

        let flat = Pitch::new(PitchLetter::B, Accidental::Flat, 4);
        assert_eq!(flat.midi_number(), Some(70));
    }

    #[test]
    fn test_octave_range() {
        assert_eq!(
            Pitch::new(PitchLetter::C, Accidental::Natural, 0).midi_number(),
            Some(12)
        );
        assert_eq!(
            Pitch::new(PitchLetter::B, Accidental::Natural, 8).midi_number(),
            Some(119)
        );
        // G9 is the highest representable note
        assert_eq!(
            Pitch::new(PitchLetter::G, Accidental::Natural, 9).midi_number(),
            Some(127)
        );
        assert_eq!(
            Pitch::new(PitchLetter::A, Accidental::Natural, 9).midi_number(),
            None
        );
    }

    #[test]
    fn test_no_octave_rollover() {
        // B#4 is a literal name, one semitone above B4
        let pitch = Pitch::new(PitchLetter::B, Accidental::Sharp, 4);
        assert_eq!(pitch.midi_number(), Some(72));
        assert_eq!(pitch.octave, 4);
    }

    #[test]
    fn test_flat_c_zero_stays_in_range() {
        let pitch = Pitch::new(PitchLetter::C, Accidental::Flat, 0);
        assert_eq!(pitch.midi_number(), Some(11));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Pitch::new(PitchLetter::C, Accidental::Sharp, 4).to_string(),
            "C#4"
        );
        assert_eq!(
            Pitch::new(PitchLetter::E, Accidental::Flat, 5).to_string(),
            "E-5"
        );
        assert_eq!(
            Pitch::new(PitchLetter::A, Accidental::Natural, 3).to_string(),
            "A3"
        );
    }
}
