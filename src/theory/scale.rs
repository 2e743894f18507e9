use std::fmt::{Display, Error, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chord::Chord;
use crate::error::EngineError;
use crate::notes::{self, degree_of, Note, DEFAULT_OCTAVE, SHARP_NAMES};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Major,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Minor,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
}

impl Mode {
    /// Semitone offset of each of the seven degrees from the tonic.
    pub fn steps(&self) -> [i32; 7] {
        match self {
            Mode::Major => [0, 2, 4, 5, 7, 9, 11],
            Mode::Dorian => [0, 2, 3, 5, 7, 9, 10],
            Mode::Phrygian => [0, 1, 3, 5, 7, 8, 10],
            Mode::Lydian => [0, 2, 4, 6, 7, 9, 11],
            Mode::Mixolydian => [0, 2, 4, 5, 7, 9, 10],
            Mode::Minor => [0, 2, 3, 5, 7, 8, 10],
            Mode::Locrian => [0, 1, 3, 5, 6, 8, 10],
            Mode::HarmonicMinor => [0, 2, 3, 5, 7, 8, 11],
            Mode::MelodicMinor => [0, 2, 3, 5, 7, 9, 11],
        }
    }

    pub fn is_minor(&self) -> bool {
        matches!(
            self,
            Mode::Minor | Mode::HarmonicMinor | Mode::MelodicMinor
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Dorian => "dorian",
            Mode::Phrygian => "phrygian",
            Mode::Lydian => "lydian",
            Mode::Mixolydian => "mixolydian",
            Mode::Minor => "minor",
            Mode::Locrian => "locrian",
            Mode::HarmonicMinor => "harmonic_minor",
            Mode::MelodicMinor => "melodic_minor",
        }
    }
}

impl FromStr for Mode {
    type Err = EngineError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mode = match text.to_lowercase().replace(['-', ' '], "_").as_str() {
            "major" | "ionian" => Mode::Major,
            "dorian" => Mode::Dorian,
            "phrygian" => Mode::Phrygian,
            "lydian" => Mode::Lydian,
            "mixolydian" => Mode::Mixolydian,
            "minor" | "aeolian" => Mode::Minor,
            "locrian" => Mode::Locrian,
            "harmonic_minor" => Mode::HarmonicMinor,
            "melodic_minor" => Mode::MelodicMinor,
            _ => {
                return Err(EngineError::InvalidScale {
                    text: text.to_owned(),
                })
            }
        };
        Ok(mode)
    }
}

/// A seven-note scale rooted at `root` (a pitch class) in `octave`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub root: u8,
    pub mode: Mode,
    pub octave: i32,
}

impl Scale {
    pub fn new(root: u8, mode: Mode, octave: i32) -> Self {
        Scale {
            root: root % 12,
            mode,
            octave,
        }
    }

    /// The note at a 1-based scale degree. Degrees past 7 continue upward
    /// into the following octaves.
    pub fn degree(&self, degree: usize) -> Note {
        let index = degree.max(1) - 1;
        let steps = self.mode.steps();
        let octaves = (index / 7) as i32;
        Note::new(degree_of(self.root, self.octave) + steps[index % 7] + 12 * octaves)
    }

    pub fn notes(&self) -> Vec<Note> {
        (1..=7).map(|degree| self.degree(degree)).collect()
    }

    pub fn contains(&self, pitch_class: u8) -> bool {
        self.notes()
            .iter()
            .any(|note| note.pitch_class() == pitch_class % 12)
    }

    /// A block chord of `n_notes` stacked thirds starting on `degree`.
    pub fn chord(&self, degree: usize, n_notes: usize, span: f64) -> Chord {
        let notes = (0..n_notes.max(1))
            .map(|step| self.degree(degree + 2 * step))
            .collect();
        Chord::stacked(notes, span)
    }

    /// Minor scales become the major scale sharing their key signature.
    pub fn relative_major(&self) -> Scale {
        if self.mode.is_minor() {
            let degree = degree_of(self.root, self.octave) + 3;
            let note = Note::new(degree);
            Scale::new(note.pitch_class(), Mode::Major, note.octave())
        } else {
            *self
        }
    }
}

impl FromStr for Scale {
    type Err = EngineError;

    /// Reads `"<root> [mode] [octave]"`, e.g. `"C major"`, `"F# dorian 3"`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidScale {
            text: text.to_owned(),
        };

        let mut words = text.split_whitespace();
        let root = words.next().ok_or_else(invalid)?;
        let root = notes::pitch_class(root).map_err(|_| invalid())?;

        let mut mode = Mode::Major;
        let mut octave = DEFAULT_OCTAVE;
        for word in words {
            match word.parse::<i32>() {
                Ok(number) => octave = number,
                Err(_) => mode = word.parse().map_err(|_| invalid())?,
            }
        }

        Ok(Scale::new(root, mode, octave))
    }
}

impl Display for Scale {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        write!(
            f,
            "{} {} {}",
            SHARP_NAMES[self.root as usize],
            self.mode.name(),
            self.octave
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::names;

    #[test]
    fn c_major_degrees() {
        let scale: Scale = "C major".parse().unwrap();
        let notes: Vec<String> = scale.notes().iter().map(Note::to_string).collect();
        assert_eq!(notes, vec!["C4", "D4", "E4", "F4", "G4", "A4", "B4"]);
        assert_eq!(scale.degree(8).to_string(), "C5");
        assert_eq!(scale.degree(10).to_string(), "E5");
    }

    #[test]
    fn stacked_thirds() {
        let scale: Scale = "C major".parse().unwrap();
        assert_eq!(names(&scale.chord(2, 4, 1.0)), vec!["D4", "F4", "A4", "C5"]);
        assert_eq!(names(&scale.chord(5, 3, 1.0)), vec!["G4", "B4", "D5"]);
    }

    #[test]
    fn relative_major_of_a_minor() {
        let scale: Scale = "A minor 3".parse().unwrap();
        let major = scale.relative_major();
        assert_eq!(major.mode, Mode::Major);
        assert_eq!(major.degree(1).to_string(), "C4");
    }

    #[test]
    fn modal_scales_are_left_alone() {
        let scale: Scale = "D dorian".parse().unwrap();
        assert_eq!(scale.relative_major(), scale);
    }

    #[test]
    fn scale_parsing() {
        let scale: Scale = "F# harmonic-minor 2".parse().unwrap();
        assert_eq!(scale, Scale::new(6, Mode::HarmonicMinor, 2));
        assert!("H major".parse::<Scale>().is_err());
        assert!("C bebop".parse::<Scale>().is_err());
        assert!("".parse::<Scale>().is_err());
    }
}
