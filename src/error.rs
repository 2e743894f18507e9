use std::fmt::{Display, Error, Formatter};

use thiserror::Error as ThisError;

use crate::colors::{BLUE, RED, WHITE};

/// Broad categories an `EngineError` falls into.
///
/// Validation and configuration errors are always returned to the caller.
/// Range and detection problems are normally recovered inside the engine and
/// only surface here when a caller asks for strict behaviour.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Construction,
    Range,
    Detection,
    Codec,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Construction => "construction",
            ErrorKind::Range => "range",
            ErrorKind::Detection => "detection",
            ErrorKind::Codec => "codec",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum EngineError {
    #[error("Pattern has {pattern} entries but {intervals} intervals were given.")]
    PatternLength { pattern: usize, intervals: usize },

    #[error("Pattern set {index} has {pattern} entries but {intervals} intervals.")]
    PatternSetLength {
        index: usize,
        pattern: usize,
        intervals: usize,
    },

    #[error("Chord has {notes} notes but {intervals} intervals.")]
    IntervalCount { notes: usize, intervals: usize },

    #[error("Cannot resolve a pattern against a chord with no notes.")]
    EmptyChord,

    #[error("Rhythm `{rhythm}` contains no tokens.")]
    EmptyRhythm { rhythm: String },

    #[error("A rhythm must span a positive number of bars, not {bars}.")]
    InvalidBars { bars: f64 },

    #[error("Accented low volume {low} must be quieter than the high volume {high}.")]
    AccentVolumes { low: u8, high: u8 },

    #[error("No rows were selected.")]
    EmptySelection,

    #[error("Row {index} does not exist; the table has {rows} rows.")]
    RowOutOfRange { index: usize, rows: usize },

    #[error("`{name}` is not a recognised chord.")]
    UnknownChord { name: String },

    #[error("`{name}` is not a valid note.")]
    InvalidNote { name: String },

    #[error("`{text}` is not a valid scale. Try something like `C major` or `A minor`.")]
    InvalidScale { text: String },

    #[error(
        "`{progression}` is not a valid chord progression. Use scale degrees 1 to 7, like `6451`."
    )]
    InvalidProgression { progression: String },

    #[error("Cannot generate a song without any chords.")]
    NoChords,

    #[error("Cannot generate from a chord progression without a scale.")]
    MissingScale,

    #[error("The {palette} palette is empty.")]
    EmptyPalette { palette: &'static str },

    #[error("Harmony needs between 1 and 3 extra notes, not {count}.")]
    HarmonyCount { count: usize },

    #[error("Octave {pitch} is outside the playable octaves -1 to 9.")]
    InvalidPitch { pitch: i32 },

    #[error("Sample rate must be a positive number of bars, not {rate}.")]
    InvalidSampleRate { rate: f64 },

    #[error("No chord could be read from the description `{description}`.")]
    Undetectable { description: String },

    #[error("Invalid chord record JSON: {message}")]
    Json { message: String },

    #[error("Note {degree} lies outside the MIDI range of 0 to 127.")]
    PitchOutOfRange { degree: i32 },

    #[error("MIDI error: {message}")]
    Midi { message: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        use self::EngineError::*;

        match self {
            PatternLength { .. }
            | PatternSetLength { .. }
            | IntervalCount { .. }
            | EmptyChord
            | EmptySelection
            | RowOutOfRange { .. }
            | InvalidProgression { .. }
            | NoChords
            | MissingScale
            | EmptyPalette { .. }
            | HarmonyCount { .. }
            | InvalidPitch { .. }
            | InvalidSampleRate { .. }
            | Json { .. } => ErrorKind::Validation,

            EmptyRhythm { .. } | InvalidBars { .. } | AccentVolumes { .. } => {
                ErrorKind::Configuration
            }

            UnknownChord { .. } | InvalidNote { .. } | InvalidScale { .. } => {
                ErrorKind::Construction
            }

            PitchOutOfRange { .. } => ErrorKind::Range,
            Undetectable { .. } => ErrorKind::Detection,
            Midi { .. } => ErrorKind::Codec,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::Json {
            message: error.to_string(),
        }
    }
}

/// An `EngineError` paired with the input it came from, for terminal output.
pub struct Report<'a> {
    pub error: &'a EngineError,
    pub input: &'a str,
}

impl<'a> Report<'a> {
    pub fn new(error: &'a EngineError, input: Option<&'a str>) -> Self {
        Report {
            error,
            input: input.unwrap_or("<stdin>"),
        }
    }
}

impl<'a> Display for Report<'a> {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        fmt_simple_error(
            f,
            &self.error.to_string(),
            self.input,
            &self.error.kind().to_string(),
        )
    }
}

pub fn fmt_simple_error(
    f: &mut Formatter,
    message: &str,
    input: &str,
    kind: &str,
) -> Result<(), Error> {
    writeln!(
        f,
        "{}: {}\n   {}: {}\n   {}: {}",
        RED.paint("error"),
        WHITE.paint(message),
        BLUE.paint("in"),
        input,
        BLUE.paint("kind"),
        kind,
    )
}
