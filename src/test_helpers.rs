use crate::chord::Chord;
use crate::notes::{Note, DEFAULT_OCTAVE};

pub fn note(name: &str) -> Note {
    Note::parse(name, DEFAULT_OCTAVE).unwrap()
}

/// A chord where every note lasts exactly as long as its interval.
pub fn chord(names: &[&str], intervals: &[f64]) -> Chord {
    let notes = names
        .iter()
        .zip(intervals)
        .map(|(name, &interval)| note(name).with_duration(interval))
        .collect();
    Chord::new(notes, intervals.to_vec()).unwrap()
}

pub fn names(chord: &Chord) -> Vec<String> {
    chord.notes.iter().map(Note::to_string).collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {} but got {}",
        expected,
        actual
    );
}
