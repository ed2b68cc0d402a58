use crate::error::SyntaxError;
use crate::types::event::MmlEvent;
use crate::types::pitch::{Accidental, Pitch, PitchLetter};

pub const DEFAULT_OCTAVE: u8 = 4;
pub const DEFAULT_LENGTH: u32 = 4;
pub const DEFAULT_TEMPO: u32 = 120;

/// Parse MML text into an ordered event sequence.
///
/// The input is normalized first: all whitespace is stripped and letters
/// are upper-cased, so `"c d e"` and `"CDE"` parse identically. Every
/// parse prepends a tempo marker for the initial 120 BPM; an empty input
/// yields exactly that one event.
pub fn parse_mml(text: &str) -> Result<Vec<MmlEvent>, SyntaxError> {
    MmlParser::new(text).parse()
}

/// Validate MML text, reporting success or failure as a boolean plus a
/// human-readable message. Never fails past this boundary.
pub fn validate_mml(text: &str) -> (bool, String) {
    match parse_mml(text) {
        Ok(_) => (true, "MML syntax is valid".to_string()),
        Err(e) => (false, e.to_string()),
    }
}

/// Single-pass scanner over normalized MML text.
///
/// Octave, default length, and tempo are scan state: they are mutated by
/// `O`/`L`/`T`/`>`/`<` as the cursor moves and discarded when the parse
/// completes.
struct MmlParser {
    chars: Vec<char>,
    pos: usize,
    octave: u8,
    length: u32,
    tempo: u32,
}

impl MmlParser {
    fn new(text: &str) -> Self {
        let chars = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        Self {
            chars,
            pos: 0,
            octave: DEFAULT_OCTAVE,
            length: DEFAULT_LENGTH,
            tempo: DEFAULT_TEMPO,
        }
    }

    fn parse(mut self) -> Result<Vec<MmlEvent>, SyntaxError> {
        let mut events = vec![MmlEvent::Tempo { bpm: self.tempo }];

        while let Some(ch) = self.peek() {
            if let Some(letter) = PitchLetter::from_char(ch) {
                self.advance();
                let accidental = self.scan_accidental();
                let quarter_length = self.scan_duration()?;
                events.push(MmlEvent::Note {
                    pitch: Pitch::new(letter, accidental, self.octave),
                    quarter_length,
                });
                continue;
            }

            match ch {
                'R' => {
                    self.advance();
                    let quarter_length = self.scan_duration()?;
                    events.push(MmlEvent::Rest { quarter_length });
                }
                'O' => {
                    self.advance();
                    match self.peek().and_then(|c| c.to_digit(10)) {
                        Some(digit) => {
                            // One digit, taken verbatim; O9 is not clamped.
                            self.octave = digit as u8;
                            self.advance();
                        }
                        None => {
                            return Err(SyntaxError::MissingDigit {
                                command: 'O',
                                offset: self.pos,
                            });
                        }
                    }
                }
                'L' => {
                    self.advance();
                    match self.scan_number()? {
                        Some(length) => self.length = length,
                        None => {
                            return Err(SyntaxError::MissingDigit {
                                command: 'L',
                                offset: self.pos,
                            });
                        }
                    }
                }
                'T' => {
                    self.advance();
                    match self.scan_number()? {
                        Some(bpm) => {
                            self.tempo = bpm;
                            // Tempo changes are interleaved in event order,
                            // not just applied to subsequent notes.
                            events.push(MmlEvent::Tempo { bpm: self.tempo });
                        }
                        None => {
                            return Err(SyntaxError::MissingDigit {
                                command: 'T',
                                offset: self.pos,
                            });
                        }
                    }
                }
                '>' => {
                    self.octave = (self.octave + 1).min(8);
                    self.advance();
                }
                '<' => {
                    self.octave = self.octave.saturating_sub(1);
                    self.advance();
                }
                _ => {
                    return Err(SyntaxError::UnknownCommand {
                        ch,
                        offset: self.pos,
                    });
                }
            }
        }

        Ok(events)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn scan_accidental(&mut self) -> Accidental {
        match self.peek() {
            Some('#') | Some('+') => {
                self.advance();
                Accidental::Sharp
            }
            Some('-') => {
                self.advance();
                Accidental::Flat
            }
            _ => Accidental::Natural,
        }
    }

    /// Length digits (falling back to the current default) followed by a
    /// run of dots. Each dot multiplies the duration by 1.5.
    fn scan_duration(&mut self) -> Result<f64, SyntaxError> {
        let length = match self.scan_number()? {
            Some(length) => length,
            None => self.length,
        };

        let mut quarter_length = 4.0 / length as f64;
        while self.peek() == Some('.') {
            self.advance();
            quarter_length *= 1.5;
        }

        Ok(quarter_length)
    }

    /// Consume a digit run as a positive integer. `Ok(None)` when the
    /// cursor is not on a digit; zero and overflowing runs are errors.
    fn scan_number(&mut self) -> Result<Option<u32>, SyntaxError> {
        let start = self.pos;
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Ok(None);
        }

        let mut value: u32 = 0;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or(SyntaxError::BadNumber { offset: start })?;
            self.advance();
        }

        if value == 0 {
            return Err(SyntaxError::BadNumber { offset: start });
        }

        Ok(Some(value))
    }
}
