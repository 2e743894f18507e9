use tracing::{debug, warn};

use crate::chord::{Chord, EPSILON};
use crate::error::EngineError;
use crate::notes::Note;
use crate::record::{quantize, ChordRecord, QUANTIZE_STEPS};
use crate::theory::{Detection, MusicTheory};

/// Highest octave a pattern entry may climb to.
const OCTAVE_CEILING: i32 = 8;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DeconstructOptions {
    /// Width of each sampled window in bars.
    pub sample_rate: f64,
    /// Octave to build every reference chord in. Defaults to the lowest
    /// octave that places each window's notes on or above their voices.
    pub pitch: Option<i32>,
    /// Subdivisions per bar that intervals are rounded to.
    pub quantize: u32,
}

impl Default for DeconstructOptions {
    fn default() -> Self {
        DeconstructOptions {
            sample_rate: 1.0,
            pitch: None,
            quantize: QUANTIZE_STEPS,
        }
    }
}

/// Samples `chord` in windows of `options.sample_rate` bars and describes
/// each non-empty window as a chord record.
///
/// Windows run from bar zero through the bar after the last whole bar, so a
/// trailing partial bar is still sampled. A window that cannot be described
/// is skipped.
pub fn deconstruct<T: MusicTheory + ?Sized>(
    chord: &Chord,
    theory: &T,
    options: &DeconstructOptions,
) -> Result<Vec<ChordRecord>, EngineError> {
    let rate = options.sample_rate;
    if !(rate > EPSILON) {
        return Err(EngineError::InvalidSampleRate { rate });
    }

    let limit = chord.bars().floor() + 1.0;
    let windows = (limit / rate - EPSILON).ceil() as usize;
    let mut records = Vec::new();

    for index in 0..windows {
        let start = index as f64 * rate;
        let end = start + rate;

        let window = chord.window(start, end);
        if window.is_empty() {
            continue;
        }

        match analyze(&window, theory, options) {
            Ok(record) => {
                debug!("Bars {} to {}: {}", start, end, record.chord);
                records.push(record.placed(start, end));
            }
            Err(error) => warn!("Skipping bars {} to {}: {}", start, end, error),
        }
    }

    Ok(records)
}

fn analyze<T: MusicTheory + ?Sized>(
    window: &Chord,
    theory: &T,
    options: &DeconstructOptions,
) -> Result<ChordRecord, EngineError> {
    let first = window.notes[0];

    let description = theory.detect(&window.notes);
    let detection = Detection::parse(&description, &first)?;
    if detection.is_slash_ambiguous {
        warn!(
            "Ambiguous chord `{}` read as `{}`",
            description,
            detection.name()
        );
    }

    let build = |pitch: i32| match detection.literal {
        Some(note) => Ok(Chord::single(note.with_octave(pitch), 1.0)),
        None => theory.build(&detection.name(), pitch),
    };

    let (pitch, reference) = match options.pitch {
        Some(pitch) => (pitch, build(pitch)?),
        None => {
            let guess = build(first.octave())?;
            match root_shift(&guess, window) {
                Some(0) | None => (first.octave(), guess),
                Some(octaves) => {
                    let pitch = first.octave() + octaves;
                    (pitch, build(pitch)?)
                }
            }
        }
    };

    let intervals = window
        .intervals
        .iter()
        .map(|&interval| quantize(interval, options.quantize))
        .collect();
    let pattern = infer_pattern(&reference, window, pitch);

    Ok(ChordRecord::new(
        &detection.name(),
        pattern,
        intervals,
        pitch,
    ))
}

/// The voice of `reference` sharing `note`'s pitch class.
fn voice_of(reference: &Chord, note: &Note) -> Option<usize> {
    reference
        .notes
        .iter()
        .position(|voice| voice.pitch_class() == note.pitch_class())
}

/// Octaves to move `reference` by so that no note of `window` sits below
/// its own voice. `None` when no note matches a voice.
fn root_shift(reference: &Chord, window: &Chord) -> Option<i32> {
    window
        .notes
        .iter()
        .filter_map(|note| {
            voice_of(reference, note)
                .map(|index| (note.degree - reference.notes[index].degree).div_euclid(12))
        })
        .min()
}

/// Describes each note of `window` as a voice of `reference` plus the whole
/// octaves it sits above that voice. Notes the reference does not contain
/// are played as its root.
fn infer_pattern(reference: &Chord, window: &Chord, pitch: i32) -> Vec<f64> {
    let octave_limit = (OCTAVE_CEILING - pitch).max(0);

    window
        .notes
        .iter()
        .map(|note| match voice_of(reference, note) {
            Some(index) => {
                let above = note.degree - reference.notes[index].degree;
                let octaves = above.div_euclid(12).max(0).min(octave_limit);
                ((index as i32 + 1) * 10 + octaves) as f64 / 10.0
            }
            None => 1.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{assert_close, chord};
    use crate::theory::StandardTheory;

    fn records(chord: &Chord, sample_rate: f64) -> Vec<ChordRecord> {
        let options = DeconstructOptions {
            sample_rate,
            ..Default::default()
        };
        deconstruct(chord, &StandardTheory, &options).unwrap()
    }

    #[test]
    fn arpeggio_becomes_one_record() {
        let arpeggio = chord(&["C4", "G4", "B4", "C5"], &[0.25, 0.25, 0.25, 0.25]);
        let found = records(&arpeggio, 1.0);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].chord, "Cmaj7");
        assert_eq!(found[0].pitch, 4);
        assert_eq!(found[0].pattern, vec![1.0, 3.0, 4.0, 1.1]);
        assert_eq!(found[0].intervals, vec![0.25; 4]);
        assert_eq!(found[0].start, 0.0);
        assert_eq!(found[0].end, Some(1.0));
    }

    #[test]
    fn pitch_is_the_octave_of_the_root() {
        let arpeggio = chord(&["E5", "A4", "C5"], &[0.25, 0.25, 0.5]);
        let found = records(&arpeggio, 1.0);

        assert_eq!(found[0].chord, "Am");
        assert_eq!(found[0].pitch, 4);
        assert_eq!(found[0].pattern, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn raised_voices_keep_their_octave_offset() {
        let arpeggio = chord(&["E5", "C4", "G4"], &[0.25, 0.25, 0.5]);
        let found = records(&arpeggio, 1.0);

        assert_eq!(found[0].chord, "Cmaj");
        assert_eq!(found[0].pitch, 4);
        assert_eq!(found[0].pattern, vec![2.1, 1.0, 3.0]);
    }

    #[test]
    fn pitch_override_raises_the_pattern() {
        let arpeggio = chord(&["C4", "E4", "G4"], &[0.25, 0.25, 0.5]);
        let options = DeconstructOptions {
            pitch: Some(3),
            ..Default::default()
        };
        let found = deconstruct(&arpeggio, &StandardTheory, &options).unwrap();
        assert_eq!(found[0].pattern, vec![1.1, 2.1, 3.1]);
    }

    #[test]
    fn windows_cover_the_trailing_partial_bar() {
        let run = chord(&["C4", "E4", "G4", "A3", "C4", "E4"], &[0.5, 0.0, 0.5, 0.5, 0.0, 0.25]);
        let found = records(&run, 1.0);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].chord, "Am");
        assert_eq!(found[1].pitch, 3);
        assert_close(found[1].start, 1.0);
    }

    #[test]
    fn single_pitch_classes_become_literal_notes() {
        let octaves = chord(&["G2", "G3"], &[0.5, 0.5]);
        let found = records(&octaves, 1.0);
        assert_eq!(found[0].chord, "G(note)");
        assert_eq!(found[0].pattern, vec![1.0, 1.1]);
        assert_eq!(found[0].pitch, 2);
    }

    #[test]
    fn unmatched_notes_default_to_the_root() {
        let reference = chord(&["C4", "E4", "G4"], &[0.0, 0.0, 1.0]);
        let window = chord(&["C4", "F#4", "G4"], &[0.25, 0.25, 0.5]);
        assert_eq!(infer_pattern(&reference, &window, 4), vec![1.0, 1.0, 3.0]);
    }

    #[test]
    fn octave_offsets_are_capped() {
        let reference = chord(&["C7"], &[1.0]);
        let window = chord(&["C7", "C9"], &[0.5, 0.5]);
        assert_eq!(infer_pattern(&reference, &window, 7), vec![1.0, 1.1]);
    }

    #[test]
    fn pitch_override_is_used() {
        let arpeggio = chord(&["C4", "E4", "G4"], &[0.25, 0.25, 0.5]);
        let options = DeconstructOptions {
            pitch: Some(2),
            ..Default::default()
        };
        let found = deconstruct(&arpeggio, &StandardTheory, &options).unwrap();
        assert_eq!(found[0].pitch, 2);
    }

    #[test]
    fn empty_windows_are_skipped() {
        let mut late = chord(&["C4", "E4", "G4"], &[0.0, 0.0, 1.0]);
        late.start_time = 2.0;
        let found = records(&late, 1.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, 2.0);
    }

    #[test]
    fn sample_rate_must_be_positive() {
        let arpeggio = chord(&["C4"], &[1.0]);
        let options = DeconstructOptions {
            sample_rate: 0.0,
            ..Default::default()
        };
        assert_eq!(
            deconstruct(&arpeggio, &StandardTheory, &options),
            Err(EngineError::InvalidSampleRate { rate: 0.0 })
        );
    }

    #[test]
    fn intervals_are_quantized() {
        let loose = chord(&["C4", "E4", "G4"], &[0.3, 0.3, 0.4]);
        let found = records(&loose, 1.0);
        assert_eq!(found[0].intervals, vec![0.3125, 0.3125, 0.375]);
    }
}
