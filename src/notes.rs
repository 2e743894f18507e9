use std::fmt::{Display, Error, Formatter};

use regex::Regex;

use crate::error::EngineError;

pub const MIN_MIDI: i32 = 0;
pub const MAX_MIDI: i32 = 127;

/// Highest note a reconstructed chord may reach before it is shifted down.
pub const SAFE_CEILING: i32 = 103;

pub const DEFAULT_OCTAVE: i32 = 4;
pub const MIN_OCTAVE: i32 = -1;
pub const MAX_OCTAVE: i32 = 9;
pub const DEFAULT_VOLUME: u8 = 100;
pub const DEFAULT_DURATION: f64 = 0.25;

pub const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

lazy_static! {
    static ref NOTE_NAME: Regex =
        Regex::new(r"^([A-Ga-g])([#b]*)(-?\d+)?$").expect("Failed to compile note name regex");
}

/// A single pitched event.
///
/// `degree` is the absolute semitone index with C4 = 60, so it equals the
/// MIDI key for every note inside the MIDI range. Durations are in bars.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Note {
    pub degree: i32,
    pub duration: f64,
    pub volume: u8,
    pub channel: u8,
}

impl Default for Note {
    fn default() -> Self {
        Note {
            degree: 60,
            duration: DEFAULT_DURATION,
            volume: DEFAULT_VOLUME,
            channel: 0,
        }
    }
}

impl Note {
    pub fn new(degree: i32) -> Self {
        Note {
            degree,
            ..Default::default()
        }
    }

    pub fn from_pitch_class(pitch_class: u8, octave: i32) -> Self {
        Note::new(degree_of(pitch_class, octave))
    }

    /// Parses names like `C4`, `F#3`, `Bb` or `e5`.
    ///
    /// Names without an octave are placed in `default_octave`. Octaves
    /// outside `MIN_OCTAVE..=MAX_OCTAVE` are rejected.
    pub fn parse(name: &str, default_octave: i32) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidNote {
            name: name.to_owned(),
        };

        let captures = NOTE_NAME.captures(name.trim()).ok_or_else(invalid)?;

        let letter = captures[1].to_ascii_uppercase();
        let base = SHARP_NAMES
            .iter()
            .position(|&candidate| candidate == letter)
            .ok_or_else(invalid)? as i32;

        let shift: i32 = captures[2]
            .chars()
            .map(|accidental| if accidental == '#' { 1 } else { -1 })
            .sum();

        let octave = match captures.get(3) {
            Some(octave) => octave.as_str().parse::<i32>().map_err(|_| invalid())?,
            None => default_octave,
        };
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(invalid());
        }

        Ok(Note::new((octave + 1) * 12 + base + shift))
    }

    pub fn pitch_class(&self) -> u8 {
        self.degree.rem_euclid(12) as u8
    }

    pub fn octave(&self) -> i32 {
        self.degree.div_euclid(12) - 1
    }

    pub fn name(&self) -> &'static str {
        SHARP_NAMES[self.pitch_class() as usize]
    }

    pub fn with_octave(self, octave: i32) -> Self {
        Note {
            degree: degree_of(self.pitch_class(), octave),
            ..self
        }
    }

    pub fn with_duration(self, duration: f64) -> Self {
        Note { duration, ..self }
    }

    pub fn with_volume(self, volume: u8) -> Self {
        Note { volume, ..self }
    }

    pub fn transposed(self, semitones: i32) -> Self {
        Note {
            degree: self.degree + semitones,
            ..self
        }
    }

    pub fn midi(&self) -> Option<u8> {
        if (MIN_MIDI..=MAX_MIDI).contains(&self.degree) {
            Some(self.degree as u8)
        } else {
            None
        }
    }
}

impl Display for Note {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        write!(f, "{}{}", self.name(), self.octave())
    }
}

pub fn degree_of(pitch_class: u8, octave: i32) -> i32 {
    (octave + 1) * 12 + i32::from(pitch_class % 12)
}

/// Reads a bare pitch-class name such as `F#` or `Bb`.
pub fn pitch_class(name: &str) -> Result<u8, EngineError> {
    let note = Note::parse(name, DEFAULT_OCTAVE)?;
    if name.trim().ends_with(|ch: char| ch.is_ascii_digit()) {
        return Err(EngineError::InvalidNote {
            name: name.to_owned(),
        });
    }
    Ok(note.pitch_class())
}

pub fn is_note_name(text: &str) -> bool {
    NOTE_NAME.is_match(text.trim())
}
