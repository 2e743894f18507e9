#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
extern crate lazy_static;

pub mod arrangement;
pub mod chord;
pub mod colors;
pub mod deconstruct;
pub mod error;
pub mod generator;
pub mod legato;
pub mod midi_generation;
pub mod notes;
pub mod pattern;
pub mod reconstruct;
pub mod record;
pub mod rhythm;
pub mod sequencer;
pub mod theory;

#[cfg(test)]
mod test_helpers;

use tracing::{debug, info};

use crate::arrangement::{Arrangement, Track};
use crate::chord::Chord;
use crate::deconstruct::DeconstructOptions;
use crate::error::EngineError;
use crate::record::{ChordRecord, NoteGroup};
use crate::theory::StandardTheory;

pub use crate::deconstruct::deconstruct;
pub use crate::generator::{data::GeneratorConfig, PopGenerator};
pub use crate::midi_generation::data::MidiGenerationOptions;
pub use crate::reconstruct::reconstruct;
pub use crate::sequencer::ChordEnhancer;

/// How a single chord is played when it is written out on its own.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlaybackOptions {
    pub bpm: u32,
    pub instrument: u8,
    pub channel: u8,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        PlaybackOptions {
            bpm: 120,
            instrument: 0,
            channel: 0,
        }
    }
}

/// Writes `chord` as a one-track MIDI file.
pub fn chord_to_midi(
    chord: Chord,
    name: &str,
    playback: &PlaybackOptions,
    options: &MidiGenerationOptions,
) -> Result<Vec<u8>, EngineError> {
    let mut track = Track::new(name, chord, playback.instrument, playback.channel);
    track.set_channel(playback.channel);

    let mut arrangement = Arrangement::new(playback.bpm);
    arrangement.add_track(0, track);

    midi_generation::generate_midi(&arrangement, options)
}

/// Reconstructs the chord records in `json` and writes them as MIDI.
pub fn records_to_midi(
    json: &str,
    playback: &PlaybackOptions,
    options: &MidiGenerationOptions,
) -> Result<Vec<u8>, EngineError> {
    let records = record::records_from_json(json)?;
    info!("Reconstructing {} chord records", records.len());

    let chord = reconstruct(&records, &StandardTheory)?;
    chord_to_midi(chord, "chords", playback, options)
}

/// Writes the literal note groups in `json` as MIDI.
pub fn note_groups_to_midi(
    json: &str,
    playback: &PlaybackOptions,
    options: &MidiGenerationOptions,
) -> Result<Vec<u8>, EngineError> {
    let groups: Vec<NoteGroup> = serde_json::from_str(json)?;
    let chord = record::chord_from_note_groups(&groups)?;
    chord_to_midi(chord, "notes", playback, options)
}

/// The chord played by the `track`th note-bearing track of a MIDI file.
/// Tracks on the drum channel are not counted.
pub fn read_midi_track(bytes: &[u8], track: usize) -> Result<Chord, EngineError> {
    let arrangement = midi_generation::read_midi(bytes)?;
    let count = arrangement.melodic_tracks().count();
    let drums = arrangement.track_count() - count;
    if drums > 0 {
        debug!("Skipping {} drum tracks", drums);
    }

    let found = arrangement
        .melodic_tracks()
        .nth(track)
        .map(|(_, found)| found.chord.clone());
    found.ok_or_else(|| EngineError::Midi {
        message: format!(
            "track {} requested but the file has {} melodic tracks",
            track, count
        ),
    })
}

/// Reads one track of a MIDI file back into chord records.
pub fn deconstruct_midi(
    bytes: &[u8],
    track: usize,
    options: &DeconstructOptions,
) -> Result<Vec<ChordRecord>, EngineError> {
    let chord = read_midi_track(bytes, track)?;
    deconstruct(&chord, &StandardTheory, options)
}
