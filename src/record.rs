use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chord::{Chord, EPSILON};
use crate::error::EngineError;
use crate::notes::{Note, DEFAULT_OCTAVE, MAX_OCTAVE, MIN_OCTAVE};

/// Subdivisions per bar that stored intervals are rounded to.
pub const QUANTIZE_STEPS: u32 = 16;

/// Largest denominator used when printing intervals as fractions.
const FRACTION_LIMIT: i64 = 64;

fn default_pitch() -> i32 {
    DEFAULT_OCTAVE
}

/// One stored segment of music: a chord name, the pattern that arpeggiates
/// it and the intervals between the pattern's notes.
///
/// Any spelling the theory can build is accepted as `chord`, but
/// deconstruction always writes the canonical one: `C` and `CM` come back
/// as `Cmaj`, `Cmin` as `Cm`. Spellings of the same quality build the same
/// notes, so a record keeps its sound through a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordRecord {
    pub chord: String,
    #[serde(default)]
    pub intervals: Vec<f64>,
    #[serde(default)]
    pub pattern: Vec<f64>,
    #[serde(default = "default_pitch")]
    pub pitch: i32,
    #[serde(default)]
    pub start: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

impl ChordRecord {
    pub fn new(chord: &str, pattern: Vec<f64>, intervals: Vec<f64>, pitch: i32) -> Self {
        ChordRecord {
            chord: chord.to_owned(),
            intervals,
            pattern,
            pitch,
            start: 0.0,
            end: None,
        }
    }

    pub fn placed(self, start: f64, end: f64) -> Self {
        ChordRecord {
            start,
            end: Some(end),
            ..self
        }
    }

    /// Bars covered by the intervals.
    pub fn bars(&self) -> f64 {
        self.intervals.iter().sum()
    }

    /// Declared length, falling back to the intervals when no end is stored.
    pub fn span(&self) -> f64 {
        match self.end {
            Some(end) => end - self.start,
            None => self.bars(),
        }
    }

    /// Pattern and intervals must line up and the pitch must be a playable
    /// octave. A record whose intervals do not fill its declared span is
    /// still accepted.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&self.pitch) {
            return Err(EngineError::InvalidPitch { pitch: self.pitch });
        }
        if self.pattern.len() != self.intervals.len() {
            return Err(EngineError::PatternLength {
                pattern: self.pattern.len(),
                intervals: self.intervals.len(),
            });
        }

        if (self.bars() - self.span()).abs() > 1.0 / f64::from(QUANTIZE_STEPS) - EPSILON {
            warn!(
                "Record `{}` at bar {} has intervals summing to {} but spans {}",
                self.chord,
                self.start,
                self.bars(),
                self.span()
            );
        }

        Ok(())
    }
}

pub fn records_from_json(json: &str) -> Result<Vec<ChordRecord>, EngineError> {
    let records: Vec<ChordRecord> = serde_json::from_str(json)?;
    for record in &records {
        record.validate()?;
    }
    Ok(records)
}

pub fn records_to_json(records: &[ChordRecord]) -> Result<String, EngineError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Rounds `value` to the nearest `1 / steps`.
pub fn quantize(value: f64, steps: u32) -> f64 {
    let steps = f64::from(steps.max(1));
    (value * steps).round() / steps
}

/// Literal notes struck together, then the wait before the next group.
/// A group without notes is a rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteGroup {
    pub notes: Vec<String>,
    pub interval: f64,
}

/// Groups notes by onset, lowest pitch first, with quantized intervals.
/// Leading silence becomes a rest group.
pub fn note_groups(chord: &Chord) -> Vec<NoteGroup> {
    let mut groups = Vec::new();
    if chord.start_time > EPSILON {
        groups.push(NoteGroup {
            notes: Vec::new(),
            interval: quantize(chord.start_time, QUANTIZE_STEPS),
        });
    }

    let mut current: Vec<Note> = Vec::new();
    for (note, &interval) in chord.notes.iter().zip(&chord.intervals) {
        current.push(*note);
        if interval > EPSILON {
            groups.push(group(&mut current, interval));
        }
    }
    if !current.is_empty() {
        groups.push(group(&mut current, 0.0));
    }

    groups
}

fn group(notes: &mut Vec<Note>, interval: f64) -> NoteGroup {
    notes.sort_by_key(|note| note.degree);
    let group = NoteGroup {
        notes: notes.iter().map(Note::to_string).collect(),
        interval: quantize(interval, QUANTIZE_STEPS),
    };
    notes.clear();
    group
}

/// Rebuilds a chord from note groups. Every note lasts until the next group.
pub fn chord_from_note_groups(groups: &[NoteGroup]) -> Result<Chord, EngineError> {
    let mut chord = Chord::default();

    for group in groups {
        if group.notes.is_empty() {
            chord.append(Chord {
                start_time: group.interval,
                ..Chord::default()
            });
            continue;
        }

        let notes = group
            .notes
            .iter()
            .map(|name| Note::parse(name, DEFAULT_OCTAVE))
            .collect::<Result<Vec<_>, _>>()?;
        chord.append(Chord::stacked(notes, group.interval));
    }

    Ok(chord)
}

/// One line per onset, e.g. `C4,E4[1/4]`.
pub fn to_markdown(chord: &Chord) -> String {
    note_groups(chord)
        .iter()
        .map(|group| {
            let notes = if group.notes.is_empty() {
                "r".to_owned()
            } else {
                group.notes.join(",")
            };
            format!("{}[{}]", notes, format_fraction(group.interval))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The closest fraction with a denominator of at most 64.
pub fn format_fraction(value: f64) -> String {
    let mut best = (0, 1);
    let mut best_error = f64::INFINITY;
    for denominator in 1..=FRACTION_LIMIT {
        let numerator = (value * denominator as f64).round() as i64;
        let error = (value - numerator as f64 / denominator as f64).abs();
        if error < best_error - EPSILON {
            best = (numerator, denominator);
            best_error = error;
        }
    }

    let (numerator, denominator) = best;
    if numerator == 0 {
        return "0".to_owned();
    }
    let divisor = gcd(numerator.abs(), denominator);
    format!("{}/{}", numerator / divisor, denominator / divisor)
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a.max(1)
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{assert_close, chord};

    #[test]
    fn missing_fields_take_defaults() {
        let records = records_from_json(r#"[{"chord": "Am7", "intervals": [1.0], "pattern": [1]}]"#)
            .unwrap();
        assert_eq!(records[0].pitch, 4);
        assert_eq!(records[0].start, 0.0);
        assert_eq!(records[0].end, None);
        assert_close(records[0].span(), 1.0);
    }

    #[test]
    fn records_round_trip_through_json() {
        let records = vec![
            ChordRecord::new("Cmaj7", vec![1.0, 3.0, 4.0, 1.1], vec![0.25; 4], 4)
                .placed(0.0, 1.0),
            ChordRecord::new("G(note)", vec![1.0], vec![1.0], 2).placed(1.0, 2.0),
        ];
        let json = records_to_json(&records).unwrap();
        assert_eq!(records_from_json(&json).unwrap(), records);
    }

    #[test]
    fn mismatched_records_are_rejected() {
        let json = r#"[{"chord": "C", "intervals": [0.5, 0.5], "pattern": [1]}]"#;
        let error = records_from_json(json).unwrap_err();
        assert_eq!(
            error,
            EngineError::PatternLength {
                pattern: 1,
                intervals: 2
            }
        );
    }

    #[test]
    fn span_mismatch_is_only_a_warning() {
        let record = ChordRecord::new("C", vec![1.0], vec![0.5], 4).placed(0.0, 1.0);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn pitches_must_be_playable_octaves() {
        for &pitch in &[-2, 10, i32::MAX] {
            let record = ChordRecord::new("C", vec![1.0], vec![1.0], pitch);
            assert_eq!(record.validate(), Err(EngineError::InvalidPitch { pitch }));
        }
        assert!(ChordRecord::new("C", vec![1.0], vec![1.0], 9).validate().is_ok());
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let error = records_from_json("[{\"intervals\": []}]").unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn groups_follow_onsets() {
        let run = chord(
            &["C#3", "C2", "C2", "D2", "A#2", "A#2", "C2", "C2", "D2", "A#2"],
            &[0.0, 0.25, 0.125, 0.0, 0.25, 0.0, 0.125, 0.125, 0.0, 0.125],
        );
        assert_eq!(
            to_markdown(&run),
            "C2,C#3[1/4]\nC2[1/8]\nD2,A#2[1/4]\nC2,A#2[1/8]\nC2[1/8]\nD2,A#2[1/8]"
        );
    }

    #[test]
    fn intervals_are_quantized() {
        let run = chord(&["C4", "D4"], &[0.26, 0.7]);
        let groups = note_groups(&run);
        assert_eq!(groups[0].interval, 0.25);
        assert_eq!(groups[1].interval, 0.6875);
    }

    #[test]
    fn groups_rebuild_the_chord() {
        let mut run = chord(&["E4", "C4", "G4"], &[0.0, 0.5, 0.5]);
        run.start_time = 0.25;
        let rebuilt = chord_from_note_groups(&note_groups(&run)).unwrap();

        assert_close(rebuilt.start_time, 0.25);
        assert_eq!(rebuilt.intervals, vec![0.0, 0.5, 0.5]);
        assert_eq!(rebuilt.notes[0].to_string(), "C4");
        assert_close(rebuilt.bars(), 1.25);
    }

    #[test]
    fn fractions_are_simplified() {
        assert_eq!(format_fraction(0.25), "1/4");
        assert_eq!(format_fraction(0.1875), "3/16");
        assert_eq!(format_fraction(1.0), "1/1");
        assert_eq!(format_fraction(1.0 / 3.0), "1/3");
        assert_eq!(format_fraction(0.001), "0");
    }
}
