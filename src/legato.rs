use crate::chord::{Chord, EPSILON};

/// Lets stacked notes ring until the next onset.
///
/// A note followed by a zero interval shares its onset with the note after
/// it. Its duration becomes the gap to the next onset, found by scanning
/// forward through the zero-interval run. The final note rings for the time
/// left in the chord. A trailing run that never reaches a positive interval
/// is left alone, as are notes that already have their own onset.
pub fn normalize(chord: &Chord) -> Chord {
    let mut normalized = chord.clone();
    let last = chord.len().saturating_sub(1);

    for index in 0..chord.len() {
        if chord.intervals[index] > EPSILON && index != last {
            continue;
        }

        let next_gap = chord.intervals[index..]
            .iter()
            .copied()
            .find(|&interval| interval > EPSILON);

        if let Some(gap) = next_gap {
            normalized.notes[index].duration = gap;
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern;
    use crate::test_helpers::{chord, note};

    fn durations(chord: &Chord) -> Vec<f64> {
        chord.notes.iter().map(|note| note.duration).collect()
    }

    #[test]
    fn stacked_notes_ring_to_the_next_onset() {
        let stacked = chord(&["C4", "E4", "G4", "C5"], &[0.0, 0.0, 0.5, 0.5]);
        let normalized = normalize(&stacked);
        assert_eq!(durations(&normalized), vec![0.5, 0.5, 0.5, 0.5]);
        assert_eq!(normalized.intervals, stacked.intervals);
    }

    #[test]
    fn struck_notes_keep_their_duration() {
        let mut run = chord(&["C4", "D4", "E4"], &[0.25, 0.25, 0.5]);
        run.notes[0].duration = 0.1;
        let normalized = normalize(&run);
        assert_eq!(durations(&normalized), vec![0.1, 0.25, 0.5]);
    }

    #[test]
    fn last_note_fills_the_remainder() {
        let mut run = chord(&["C4", "D4"], &[0.25, 0.75]);
        run.notes[1].duration = 0.1;
        assert_eq!(durations(&normalize(&run)), vec![0.25, 0.75]);
    }

    #[test]
    fn trailing_zero_run_is_untouched() {
        let run = chord(&["C4", "E4"], &[0.5, 0.0]);
        assert_eq!(durations(&normalize(&run)), vec![0.5, 0.0]);
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let triad = Chord::stacked(vec![note("C4"), note("E4"), note("G4")], 1.0);
        let samples = vec![
            chord(&["C4", "E4", "G4", "C5"], &[0.0, 0.0, 0.5, 0.5]),
            chord(&["C4", "E4"], &[0.5, 0.0]),
            pattern::apply(&triad, &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0], &[0.0, 0.0, 0.5, 0.0, 0.0, 0.5])
                .unwrap(),
            Chord::default(),
        ];

        for sample in samples {
            let once = normalize(&sample);
            assert_eq!(normalize(&once), once);
        }
    }
}
