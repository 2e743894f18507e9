use regex::Regex;

use crate::chord::Chord;
use crate::error::EngineError;
use crate::notes::{self, degree_of, Note, SHARP_NAMES};

mod detection;
pub mod qualities;
mod scale;

pub use self::detection::{Detection, NOTE_MARKER};
pub use self::qualities::{Quality, QUALITIES};
pub use self::scale::{Mode, Scale};

lazy_static! {
    static ref CHORD_NAME: Regex = Regex::new(r"^([A-G][#b]?)([^/]*)(?:/([A-Ga-g][#b]?))?$")
        .expect("Failed to compile chord name regex");
}

/// The chord vocabulary the engine relies on: naming note sets, turning
/// names back into voicings, and reading scales.
pub trait MusicTheory {
    /// A human-readable description of the chord formed by `notes`.
    ///
    /// Descriptions take one of the forms `Cmaj7`, `Cmaj/E` (inversion),
    /// `[Am7]/[C6]` (ambiguous), `note C4` (a single pitch class) or
    /// `C with major third`.
    fn detect(&self, notes: &[Note]) -> String;

    /// The reference voicing for `name` with its root in octave `pitch`,
    /// voices ascending, sounding together for one bar.
    fn build(&self, name: &str, pitch: i32) -> Result<Chord, EngineError>;

    fn scale_degree(&self, scale: &Scale, degree: usize) -> Note {
        scale.degree(degree)
    }
}

/// Table-driven theory over the qualities in [`QUALITIES`].
#[derive(Debug, Default, Copy, Clone)]
pub struct StandardTheory;

impl MusicTheory for StandardTheory {
    fn detect(&self, notes: &[Note]) -> String {
        let lowest = match notes.iter().min_by_key(|note| note.degree) {
            Some(note) => *note,
            None => return String::new(),
        };

        let mut classes: Vec<u8> = notes.iter().map(Note::pitch_class).collect();
        classes.sort_unstable();
        classes.dedup();

        if classes.len() == 1 {
            return format!("note {}", lowest);
        }

        let bass = lowest.pitch_class();

        let exact: Vec<(u8, &Quality)> = classes
            .iter()
            .flat_map(|&root| QUALITIES.iter().map(move |quality| (root, quality)))
            .filter(|(root, quality)| quality.pitch_classes(*root) == classes)
            .collect();

        if !exact.is_empty() {
            let rooted: Vec<String> = exact
                .iter()
                .filter(|(root, _)| *root == bass)
                .map(|(root, quality)| chord_name(*root, quality))
                .collect();
            if !rooted.is_empty() {
                return describe_candidates(&rooted);
            }

            let inverted: Vec<String> = exact
                .iter()
                .map(|(root, quality)| chord_name(*root, quality))
                .collect();
            if inverted.len() == 1 {
                return format!("{}/{}", inverted[0], lowest.name());
            }
            return describe_candidates(&inverted);
        }

        if classes.len() > 2 {
            let superset = QUALITIES
                .iter()
                .map(|quality| (quality, quality.pitch_classes(bass)))
                .filter(|(_, set)| classes.iter().all(|class| set.contains(class)))
                .min_by_key(|(_, set)| set.len());
            if let Some((quality, _)) = superset {
                return chord_name(bass, quality);
            }
        }

        let offsets: Vec<u8> = classes
            .iter()
            .map(|class| (12 + class - bass) % 12)
            .filter(|&offset| offset != 0)
            .collect();
        let interval = if offsets.contains(&4) {
            4
        } else if offsets.contains(&3) {
            3
        } else {
            offsets.iter().copied().min().unwrap_or(7)
        };

        format!("{} with {}", lowest.name(), interval_name(interval))
    }

    fn build(&self, name: &str, pitch: i32) -> Result<Chord, EngineError> {
        let unknown = || EngineError::UnknownChord {
            name: name.to_owned(),
        };

        let captures = CHORD_NAME.captures(name.trim()).ok_or_else(unknown)?;
        let root = notes::pitch_class(&captures[1]).map_err(|_| unknown())?;
        let quality = qualities::lookup(&captures[2]).ok_or_else(unknown)?;

        let base = degree_of(root, pitch);
        let voices = quality
            .intervals
            .iter()
            .map(|interval| Note::new(base + interval))
            .collect();
        let chord = Chord::stacked(voices, 1.0);

        match captures.get(3) {
            Some(bass) => {
                let bass = notes::pitch_class(bass.as_str()).map_err(|_| unknown())?;
                Ok(over_bass(chord, bass))
            }
            None => Ok(chord),
        }
    }
}

fn chord_name(root: u8, quality: &Quality) -> String {
    format!("{}{}", SHARP_NAMES[root as usize], quality.name)
}

fn describe_candidates(candidates: &[String]) -> String {
    if candidates.len() == 1 {
        return candidates[0].clone();
    }
    candidates
        .iter()
        .map(|candidate| format!("[{}]", candidate))
        .collect::<Vec<_>>()
        .join("/")
}

fn interval_name(semitones: u8) -> &'static str {
    match semitones % 12 {
        1 => "minor second",
        2 => "major second",
        3 => "minor third",
        4 => "major third",
        5 => "perfect fourth",
        6 => "tritone",
        7 => "perfect fifth",
        8 => "minor sixth",
        9 => "major sixth",
        10 => "minor seventh",
        11 => "major seventh",
        _ => "unison",
    }
}

/// Inverts `chord` until `bass` is its lowest voice, or adds `bass` beneath
/// the root when the chord does not contain it.
fn over_bass(chord: Chord, bass: u8) -> Chord {
    if chord.notes.iter().any(|note| note.pitch_class() == bass) {
        let mut inverted = chord;
        for _ in 0..inverted.len() {
            match inverted.lowest_note() {
                Some(lowest) if lowest.pitch_class() != bass => inverted = inverted.inversion(1),
                _ => break,
            }
        }
        return inverted;
    }

    let root = match chord.lowest_note() {
        Some(note) => note,
        None => return chord,
    };
    let gap = (i32::from(root.pitch_class()) - i32::from(bass)).rem_euclid(12);
    let mut voices = vec![Note::new(root.degree - gap)];
    voices.extend(chord.notes);
    Chord::stacked(voices, 1.0)
}
