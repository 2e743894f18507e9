use tracing::{debug, warn};

use crate::chord::{Chord, EPSILON};
use crate::error::EngineError;
use crate::legato;
use crate::notes::{Note, DEFAULT_OCTAVE, MAX_MIDI, MIN_MIDI, SAFE_CEILING};
use crate::pattern;
use crate::record::ChordRecord;
use crate::theory::{MusicTheory, NOTE_MARKER};

/// Plays `records` one after another as a single chord.
///
/// Each record's chord is built in its octave and arpeggiated by its
/// pattern. A record starting past the end of the music so far is preceded
/// by silence. The result is normalized for legato and moved into a
/// playable range.
pub fn reconstruct<T: MusicTheory + ?Sized>(
    records: &[ChordRecord],
    theory: &T,
) -> Result<Chord, EngineError> {
    let mut chord = Chord::default();

    for record in records {
        record.validate()?;

        let gap = record.start - chord.bars();
        if gap > EPSILON {
            chord.append(Chord {
                start_time: gap,
                ..Chord::default()
            });
        }

        let reference = reference_chord(theory, &record.chord, record.pitch)?;
        chord.append(pattern::apply(&reference, &record.pattern, &record.intervals)?);
    }

    Ok(fit_midi_range(legato::normalize(&chord)))
}

/// Builds `name` in octave `pitch`, treating it as a single note when it is
/// not a chord the theory knows.
pub fn reference_chord<T: MusicTheory + ?Sized>(
    theory: &T,
    name: &str,
    pitch: i32,
) -> Result<Chord, EngineError> {
    theory.build(name, pitch).or_else(|error| {
        let literal = name.trim().trim_end_matches(NOTE_MARKER);
        match Note::parse(literal, pitch) {
            Ok(note) => {
                debug!("Building `{}` as the note {}", name, note);
                Ok(Chord::single(note, 1.0))
            }
            Err(_) => Err(error),
        }
    })
}

/// Drops the chord by octaves while its highest note is above the safe
/// ceiling and there is room below. If notes still fall outside the MIDI
/// range, every note is moved into the default octave instead.
pub fn fit_midi_range(chord: Chord) -> Chord {
    let mut chord = chord;

    while let (Some(highest), Some(lowest)) = (chord.highest(), chord.lowest()) {
        if highest <= SAFE_CEILING || lowest - 12 < MIN_MIDI {
            break;
        }
        chord = chord.transposed(-12);
    }

    match (chord.highest(), chord.lowest()) {
        (Some(highest), Some(lowest)) if highest > MAX_MIDI || lowest < MIN_MIDI => {
            warn!(
                "Notes from {} to {} do not fit in the MIDI range; flattening to octave {}",
                lowest, highest, DEFAULT_OCTAVE
            );
            chord.normalized_octave(DEFAULT_OCTAVE)
        }
        _ => chord,
    }
}
