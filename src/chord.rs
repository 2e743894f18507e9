use std::fmt::{Display, Error, Formatter};

use crate::error::EngineError;
use crate::notes::{degree_of, Note};

/// Tolerance used when comparing positions and lengths measured in bars.
pub const EPSILON: f64 = 1e-9;

/// An ordered run of notes with the gap before each following onset.
///
/// `intervals[i]` is the time in bars between the onset of note `i` and the
/// onset of note `i + 1`; zero stacks the next note on top of this one. The
/// interval after the final note is the time remaining until the chord ends.
/// Durations are independent of intervals: a note may ring past the next
/// onset or stop before it.
///
/// `start_time` is silence before the first onset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chord {
    pub notes: Vec<Note>,
    pub intervals: Vec<f64>,
    pub start_time: f64,
}

impl Chord {
    pub fn new(notes: Vec<Note>, intervals: Vec<f64>) -> Result<Self, EngineError> {
        if notes.len() != intervals.len() {
            return Err(EngineError::IntervalCount {
                notes: notes.len(),
                intervals: intervals.len(),
            });
        }

        Ok(Chord {
            notes,
            intervals,
            start_time: 0.0,
        })
    }

    /// All `notes` sounding together for `span` bars.
    pub fn stacked(notes: Vec<Note>, span: f64) -> Self {
        let count = notes.len();
        let notes = notes
            .into_iter()
            .map(|note| note.with_duration(span))
            .collect();
        let intervals = (0..count)
            .map(|index| if index + 1 == count { span } else { 0.0 })
            .collect();

        Chord {
            notes,
            intervals,
            start_time: 0.0,
        }
    }

    pub fn single(note: Note, interval: f64) -> Self {
        Chord {
            notes: vec![note],
            intervals: vec![interval],
            start_time: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Length of the chord in bars: leading silence plus every interval.
    pub fn bars(&self) -> f64 {
        self.start_time + self.intervals.iter().sum::<f64>()
    }

    /// Absolute onset of every note, in bars from the start of the chord.
    pub fn onsets(&self) -> Vec<f64> {
        let mut cursor = self.start_time;
        self.intervals
            .iter()
            .map(|interval| {
                let onset = cursor;
                cursor += interval;
                onset
            })
            .collect()
    }

    pub fn highest(&self) -> Option<i32> {
        self.notes.iter().map(|note| note.degree).max()
    }

    pub fn lowest(&self) -> Option<i32> {
        self.notes.iter().map(|note| note.degree).min()
    }

    pub fn lowest_note(&self) -> Option<Note> {
        self.notes.iter().copied().min_by_key(|note| note.degree)
    }

    /// Sorted, de-duplicated pitch classes of every note.
    pub fn pitch_classes(&self) -> Vec<u8> {
        let mut classes: Vec<u8> = self.notes.iter().map(Note::pitch_class).collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    /// Plays `other` after this chord has finished.
    pub fn append(&mut self, other: Chord) {
        match self.intervals.last_mut() {
            Some(last) => *last += other.start_time,
            None => self.start_time += other.start_time,
        }
        self.notes.extend(other.notes);
        self.intervals.extend(other.intervals);
    }

    pub fn appended(mut self, other: Chord) -> Chord {
        self.append(other);
        self
    }

    /// Plays this chord and `other` at the same time, interleaving their
    /// onsets. The result lasts as long as the longer of the two.
    pub fn merge(&self, other: &Chord) -> Chord {
        let end = self.bars().max(other.bars());

        let mut events: Vec<(f64, Note)> = self
            .onsets()
            .into_iter()
            .zip(self.notes.iter().copied())
            .chain(other.onsets().into_iter().zip(other.notes.iter().copied()))
            .collect();
        // Stable, so notes sharing an onset keep their relative order.
        events.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        from_timeline(events, end)
    }

    pub fn transposed(&self, semitones: i32) -> Chord {
        Chord {
            notes: self
                .notes
                .iter()
                .map(|note| note.transposed(semitones))
                .collect(),
            ..self.clone()
        }
    }

    pub fn set_volume(&mut self, volume: u8) {
        for note in &mut self.notes {
            note.volume = volume;
        }
    }

    pub fn set_channel(&mut self, channel: u8) {
        for note in &mut self.notes {
            note.channel = channel;
        }
    }

    /// Moves every note into `octave`, keeping pitch classes.
    pub fn normalized_octave(&self, octave: i32) -> Chord {
        Chord {
            notes: self
                .notes
                .iter()
                .map(|note| Note {
                    degree: degree_of(note.pitch_class(), octave),
                    ..*note
                })
                .collect(),
            ..self.clone()
        }
    }

    /// Reverses the note order while leaving the timing untouched.
    pub fn reversed(&self) -> Chord {
        let mut notes = self.notes.clone();
        notes.reverse();
        Chord {
            notes,
            ..self.clone()
        }
    }

    /// Drops the voices at the given 1-based positions. Remaining notes keep
    /// their onsets and the chord keeps its length.
    pub fn omit(&self, voices: &[usize]) -> Chord {
        let events: Vec<(f64, Note)> = self
            .onsets()
            .into_iter()
            .zip(self.notes.iter().copied())
            .enumerate()
            .filter(|(index, _)| !voices.contains(&(index + 1)))
            .map(|(_, event)| event)
            .collect();

        if events.is_empty() {
            return self.clone();
        }

        from_timeline(events, self.bars())
    }

    /// Raises the lowest `count` notes by an octave, one at a time.
    pub fn inversion(&self, count: usize) -> Chord {
        let mut chord = self.clone();
        for _ in 0..count.min(self.len()) {
            let lowest = chord
                .notes
                .iter()
                .enumerate()
                .min_by_key(|(_, note)| note.degree)
                .map(|(index, _)| index);
            if let Some(index) = lowest {
                chord.notes[index].degree += 12;
            }
        }

        let mut degrees: Vec<i32> = chord.notes.iter().map(|note| note.degree).collect();
        degrees.sort_unstable();
        for (note, degree) in chord.notes.iter_mut().zip(degrees) {
            note.degree = degree;
        }
        chord
    }

    /// The notes whose onsets fall inside `[start, end)`, with their own
    /// intervals. The window's own leading silence is dropped.
    pub fn window(&self, start: f64, end: f64) -> Chord {
        let mut window = Chord::default();
        let events = self.onsets().into_iter().zip(&self.notes).zip(&self.intervals);
        for ((onset, note), interval) in events {
            if onset >= start - EPSILON && onset < end - EPSILON {
                window.notes.push(*note);
                window.intervals.push(*interval);
            }
        }
        window
    }

    /// Forces the chord to last exactly `span` bars.
    ///
    /// The notes sounding at the final onset ring until `span`; anything
    /// starting at or after `span` is dropped and every remaining duration is
    /// clipped at `span`.
    pub fn reconciled(&self, span: f64) -> Chord {
        let onsets = self.onsets();

        let mut notes = self.notes.clone();
        if let Some(&last_onset) = onsets.last() {
            for (note, &onset) in notes.iter_mut().zip(&onsets) {
                if (onset - last_onset).abs() < EPSILON && span - onset > EPSILON {
                    note.duration = span - onset;
                }
            }
        }

        let events: Vec<(f64, Note)> = onsets
            .into_iter()
            .zip(notes)
            .filter(|(onset, _)| *onset < span - EPSILON)
            .map(|(onset, note)| {
                let duration = note.duration.min(span - onset);
                (onset, note.with_duration(duration))
            })
            .collect();

        let mut chord = from_timeline(events, span);
        if chord.is_empty() {
            chord.start_time = span;
        }
        chord
    }
}

/// Builds a chord from absolutely positioned notes sorted by onset, ending
/// at `end`.
pub fn from_timeline(events: Vec<(f64, Note)>, end: f64) -> Chord {
    let start_time = events.first().map(|event| event.0).unwrap_or(end);

    let intervals = events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let next = events.get(index + 1).map(|next| next.0).unwrap_or(end);
            (next - event.0).max(0.0)
        })
        .collect();

    Chord {
        notes: events.into_iter().map(|event| event.1).collect(),
        intervals,
        start_time: if start_time > EPSILON { start_time } else { 0.0 },
    }
}

impl Display for Chord {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let notes = self
            .notes
            .iter()
            .map(Note::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let intervals = self
            .intervals
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "chord(notes=[{}], interval=[{}]", notes, intervals)?;
        if self.start_time > 0.0 {
            write!(f, ", start_time={}", self.start_time)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{assert_close, chord, note};

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert_eq!(
            Chord::new(vec![note("C4")], vec![]),
            Err(EngineError::IntervalCount {
                notes: 1,
                intervals: 0
            })
        );
    }

    #[test]
    fn stacked_chord_spans_its_length() {
        let stacked = Chord::stacked(vec![note("C4"), note("E4"), note("G4")], 1.0);
        assert_eq!(stacked.intervals, vec![0.0, 0.0, 1.0]);
        assert_close(stacked.bars(), 1.0);
        assert!(stacked.notes.iter().all(|n| n.duration == 1.0));
    }

    #[test]
    fn append_carries_leading_silence() {
        let mut first = chord(&["C4"], &[0.5]);
        let mut second = chord(&["D4"], &[0.25]);
        second.start_time = 0.25;
        first.append(second);

        assert_eq!(first.intervals, vec![0.75, 0.25]);
        assert_close(first.bars(), 1.0);
    }

    #[test]
    fn merge_interleaves_onsets() {
        let upper = chord(&["C5", "D5", "E5", "F5"], &[0.25, 0.25, 0.25, 0.25]);
        let lower = chord(&["C3", "G3"], &[0.5, 0.5]);
        let merged = upper.merge(&lower);

        let names: Vec<String> = merged.notes.iter().map(Note::to_string).collect();
        assert_eq!(names, vec!["C5", "C3", "D5", "E5", "G3", "F5"]);
        assert_eq!(merged.intervals, vec![0.0, 0.25, 0.25, 0.0, 0.25, 0.25]);
        assert_close(merged.bars(), 1.0);
    }

    #[test]
    fn window_selects_by_onset() {
        let run = chord(&["C4", "D4", "E4", "F4"], &[0.5, 0.5, 0.5, 0.5]);
        let window = run.window(1.0, 2.0);
        assert_eq!(window.len(), 2);
        assert_eq!(window.notes[0].to_string(), "E4");
    }

    #[test]
    fn reconciled_pads_short_chords() {
        let short = chord(&["C4", "E4"], &[0.25, 0.25]);
        let padded = short.reconciled(1.0);
        assert_close(padded.bars(), 1.0);
        assert_close(padded.notes[1].duration, 0.75);
    }

    #[test]
    fn reconciled_trims_long_chords() {
        let long = chord(&["C4", "E4", "G4"], &[0.5, 0.5, 0.5]);
        let trimmed = long.reconciled(1.0);
        assert_eq!(trimmed.len(), 2);
        assert_close(trimmed.bars(), 1.0);
    }

    #[test]
    fn inversion_raises_the_lowest_note() {
        let triad = Chord::stacked(vec![note("C4"), note("E4"), note("G4")], 1.0);
        let first = triad.inversion(1);
        let names: Vec<String> = first.notes.iter().map(Note::to_string).collect();
        assert_eq!(names, vec!["E4", "G4", "C5"]);
    }

    #[test]
    fn omit_keeps_the_total_length() {
        let seventh = chord(&["C4", "E4", "G4", "B4"], &[0.25, 0.25, 0.25, 0.25]);
        let omitted = seventh.omit(&[3]);
        assert_eq!(omitted.len(), 3);
        assert_close(omitted.bars(), 1.0);
    }

    #[test]
    fn display_lists_notes_and_intervals() {
        let pair = chord(&["C4", "G4"], &[0.0, 0.5]);
        assert_eq!(pair.to_string(), "chord(notes=[C4, G4], interval=[0, 0.5])");
    }
}
