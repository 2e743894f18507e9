use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chord::Chord;
use crate::theory::Scale;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub unit: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature { beats: 4, unit: 4 }
    }
}

impl TimeSignature {
    /// Length of a bar in quarter notes.
    pub fn quarters_per_bar(&self) -> f64 {
        f64::from(self.beats) * 4.0 / f64::from(self.unit.max(1))
    }
}

/// Channel 10 in General MIDI, counting from zero.
pub const DRUM_CHANNEL: u8 = 9;

/// A chord played by one instrument on one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub chord: Chord,
    pub instrument: u8,
    pub channel: u8,
    /// Channel volume, applied on top of each note's own velocity.
    pub volume: Option<u8>,
    pub key: Option<Scale>,
    pub time_signature: Option<TimeSignature>,
}

impl Track {
    pub fn new(name: &str, chord: Chord, instrument: u8, channel: u8) -> Self {
        Track {
            name: name.to_owned(),
            chord,
            instrument,
            channel,
            volume: None,
            key: None,
            time_signature: None,
        }
    }

    pub fn with_volume(self, volume: u8) -> Self {
        Track {
            volume: Some(volume),
            ..self
        }
    }

    /// Percussion tracks name drum sounds, not pitches.
    pub fn is_drum(&self) -> bool {
        self.channel == DRUM_CHANNEL
    }

    /// Moves the track and every note in it onto `channel`.
    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel;
        self.chord.set_channel(channel);
    }

    /// Plays `chord` after everything already in the track.
    pub fn add(&mut self, chord: Chord) {
        self.chord.append(chord);
    }

    pub fn clear(&mut self) {
        self.chord = Chord::default();
    }

    pub fn bars(&self) -> f64 {
        self.chord.bars()
    }
}

/// Tracks keyed by the bar they start on.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrangement {
    pub bpm: u32,
    pub time_signature: TimeSignature,
    parts: BTreeMap<u32, Vec<Track>>,
}

impl Default for Arrangement {
    fn default() -> Self {
        Arrangement::new(120)
    }
}

impl Arrangement {
    pub fn new(bpm: u32) -> Self {
        Arrangement {
            bpm,
            time_signature: TimeSignature::default(),
            parts: BTreeMap::new(),
        }
    }

    pub fn add_track(&mut self, bar: u32, track: Track) {
        self.parts.entry(bar).or_insert_with(Vec::new).push(track);
    }

    /// Every track with its starting bar, earliest first.
    pub fn tracks(&self) -> impl Iterator<Item = (u32, &Track)> + '_ {
        self.parts
            .iter()
            .flat_map(|(&bar, tracks)| tracks.iter().map(move |track| (bar, track)))
    }

    /// Every track off the drum channel, in the order of `tracks`.
    pub fn melodic_tracks(&self) -> impl Iterator<Item = (u32, &Track)> + '_ {
        self.tracks().filter(|(_, track)| !track.is_drum())
    }

    pub fn tracks_at(&self, bar: u32) -> &[Track] {
        self.parts.get(&bar).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn track_count(&self) -> usize {
        self.parts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.track_count() == 0
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }

    /// Bar at which the last track finishes.
    pub fn bars(&self) -> f64 {
        self.tracks()
            .map(|(bar, track)| f64::from(bar) + track.bars())
            .fold(0.0, f64::max)
    }
}
