use serde::{Deserialize, Serialize};

use crate::chord::Chord;
use crate::rhythm::RHYTHM_VARIANTS;
use crate::sequencer::data::SampleMode;

/// Progressions picked from when none is given, as scale degrees.
pub const PRESET_PROGRESSIONS: &[&str] = &["6451", "1564", "4536", "1625", "6543"];

/// Every knob of the song generator. Missing fields take their defaults, so
/// a partial JSON file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Bars to generate. The last chord may run past it.
    pub length: u32,
    pub melody_instrument: u8,
    pub chord_instrument: u8,
    pub bass_instrument: u8,
    pub bpm: u32,

    /// Sizes a progression's chords are built with; one is picked per
    /// progression.
    pub chord_notes_num: Vec<usize>,
    /// Bars each progression chord lasts.
    pub chord_duration: f64,
    /// Strum gaps picked from for each chord. Zero plays the chord as a
    /// block.
    pub selected_chord_intervals: Vec<f64>,

    pub melody_durations: Vec<f64>,
    pub melody_octave: i32,

    pub chord_progression: Option<String>,

    pub bass_octave: i32,
    pub bass_rhythms: Vec<String>,
    pub bass_sample_mode: SampleMode,
    /// Accent the bass rhythm, bouncing its quiet onsets.
    pub bass_accent: bool,
    /// Velocities of accented bass beats and of the onsets between them.
    pub bass_high_volume: u8,
    pub bass_low_volume: u8,

    pub harmonize: bool,
    pub num_harmony_notes: usize,
    /// Chance of a melody note being a passing tone instead of a chord tone.
    pub variance: f64,

    pub melody_volume: u8,
    pub chord_volume: u8,
    pub bass_volume: u8,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            length: 10,
            melody_instrument: 25,
            chord_instrument: 47,
            bass_instrument: 38,
            bpm: 120,

            chord_notes_num: vec![4],
            chord_duration: 1.0,
            selected_chord_intervals: vec![0.125],

            melody_durations: vec![0.375, 0.625, 0.125, 0.5, 0.25, 0.75, 0.1875],
            melody_octave: 5,

            chord_progression: None,

            bass_octave: 2,
            bass_rhythms: vec![RHYTHM_VARIANTS[0].rhythm.to_owned()],
            bass_sample_mode: SampleMode::RoundRobin,
            bass_accent: false,
            bass_high_volume: 100,
            bass_low_volume: 80,

            harmonize: false,
            num_harmony_notes: 1,
            variance: 0.3,

            melody_volume: 80,
            chord_volume: 60,
            bass_volume: 60,
        }
    }
}

/// The three parts of a generated song, each starting at bar zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedParts {
    pub melody: Chord,
    pub chords: Chord,
    pub bass: Chord,
}
