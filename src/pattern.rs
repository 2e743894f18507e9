use serde::Serialize;

use crate::chord::Chord;
use crate::error::EngineError;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PatternVariant {
    pub name: &'static str,
    pub pattern: &'static [f64],
    pub intervals: &'static [f64],
}

pub const PATTERN_VARIANTS: &[PatternVariant] = &[
    PatternVariant {
        name: "ascending",
        pattern: &[1.0, 2.0, 3.0, 1.1],
        intervals: &[0.25, 0.25, 0.25, 0.25],
    },
    PatternVariant {
        name: "descending",
        pattern: &[1.1, 3.0, 2.0, 1.0],
        intervals: &[0.25, 0.25, 0.25, 0.25],
    },
    PatternVariant {
        name: "alberti",
        pattern: &[1.0, 3.0, 2.0, 3.0, 1.0, 3.0, 2.0, 3.0],
        intervals: &[0.125; 8],
    },
    PatternVariant {
        name: "broken",
        pattern: &[1.0, 2.0, 3.0, 4.0, 1.1, 4.0, 3.0, 2.0],
        intervals: &[0.125; 8],
    },
    PatternVariant {
        name: "pulse",
        pattern: &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0],
        intervals: &[0.0, 0.0, 0.5, 0.0, 0.0, 0.5],
    },
    PatternVariant {
        name: "root_fifth",
        pattern: &[1.0, 3.0, 1.1, 3.0],
        intervals: &[0.375, 0.125, 0.375, 0.125],
    },
];

/// One decoded pattern entry: a 1-based voice and how many octaves above
/// that voice to play it.
///
/// `3.1` is the third voice one octave up; `2.0` is the second voice as is.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PatternEntry {
    pub voice: usize,
    pub octaves: u32,
}

impl PatternEntry {
    pub fn from_value(value: f64) -> Self {
        let tenths = (value * 10.0).round().max(0.0) as u64;
        PatternEntry {
            voice: (tenths / 10) as usize,
            octaves: (tenths % 10) as u32,
        }
    }

    pub fn value(&self) -> f64 {
        (self.voice as f64 * 10.0 + f64::from(self.octaves)) / 10.0
    }

    /// Keeps the voice inside `[1, voices]` without touching the octave.
    pub fn clamped(self, voices: usize) -> Self {
        PatternEntry {
            voice: self.voice.max(1).min(voices.max(1)),
            ..self
        }
    }
}

/// Clamps the voice of `entry` into `[1, voices]`, keeping its octave part:
/// `clamp(5.1, 4) == 4.1` and `clamp(0.3, 4) == 1.3`.
pub fn clamp(entry: f64, voices: usize) -> f64 {
    PatternEntry::from_value(entry).clamped(voices).value()
}

pub fn clamp_pattern(pattern: &[f64], voices: usize) -> Vec<f64> {
    pattern.iter().map(|&entry| clamp(entry, voices)).collect()
}

/// Arpeggiates `chord`: each pattern entry picks a voice of the chord,
/// raised by its octaves, and waits the matching interval before the next.
///
/// Each note lasts as long as its interval; [`legato`](crate::legato) fixes
/// the durations of notes that share an onset.
pub fn apply(chord: &Chord, pattern: &[f64], intervals: &[f64]) -> Result<Chord, EngineError> {
    if pattern.len() != intervals.len() {
        return Err(EngineError::PatternLength {
            pattern: pattern.len(),
            intervals: intervals.len(),
        });
    }
    if chord.is_empty() {
        return Err(EngineError::EmptyChord);
    }

    let notes = pattern
        .iter()
        .zip(intervals)
        .map(|(&entry, &interval)| {
            let entry = PatternEntry::from_value(entry).clamped(chord.len());
            chord.notes[entry.voice - 1]
                .transposed(12 * entry.octaves as i32)
                .with_duration(interval)
        })
        .collect();

    Chord::new(notes, intervals.to_vec())
}
