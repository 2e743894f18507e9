pub mod data;

use rand::Rng;
use tracing::{debug, warn};

use self::data::*;

use crate::arrangement::{TimeSignature, Track};
use crate::chord::{self, Chord};
use crate::error::EngineError;
use crate::legato;
use crate::notes::Note;
use crate::pattern::{self, PATTERN_VARIANTS};
use crate::rhythm::{self, Bounce, RhythmOptions, RHYTHM_VARIANTS};
use crate::theory::{Detection, MusicTheory, StandardTheory};

/// Chords every preset table starts from, with the octave each is built in
/// and how many times it is inverted.
const PRESET_CHORDS: &[(&str, i32, usize)] = &[
    ("Fmaj7", 3, 0),
    ("G7", 3, 0),
    ("Am7", 3, 0),
    ("D7", 3, 2),
    ("FmM7", 3, 2),
    ("Gaug7", 3, 0),
    ("Cmaj7", 4, 0),
    ("Bdim7", 3, 0),
];

/// An ordered table of chord rows that rhythms, patterns and bass lines are
/// applied to in batches.
///
/// Operations take an optional list of row indices; `None` selects every
/// row.
#[derive(Debug, Clone)]
pub struct ChordEnhancer<T: MusicTheory = StandardTheory> {
    theory: T,
    rows: Vec<Row>,
    pub time_signature: TimeSignature,
}

impl Default for ChordEnhancer<StandardTheory> {
    fn default() -> Self {
        ChordEnhancer::with_theory(StandardTheory)
    }
}

impl ChordEnhancer<StandardTheory> {
    pub fn new() -> Self {
        ChordEnhancer::default()
    }
}

impl<T: MusicTheory> ChordEnhancer<T> {
    pub fn with_theory(theory: T) -> Self {
        ChordEnhancer {
            theory,
            rows: Vec::new(),
            time_signature: TimeSignature::default(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
    }

    /// Where the next row starts when no start is given.
    pub fn latest_end(&self) -> f64 {
        self.rows.last().map(|row| row.end).unwrap_or(0.0)
    }

    /// Adds `chord` as a new row and returns its index.
    ///
    /// Without a name the chord is named by detection. Without a start the
    /// row follows the previous one, and without an end it lasts one bar.
    pub fn add_chord(
        &mut self,
        chord: Chord,
        name: Option<&str>,
        start: Option<f64>,
        end: Option<f64>,
    ) -> usize {
        let name = match name {
            Some(name) => name.to_owned(),
            None => self.detect_name(&chord),
        };
        let start = start.unwrap_or_else(|| self.latest_end());
        let end = end.unwrap_or(start + DEFAULT_ROW_SPAN);

        debug!("Row {}: `{}` from bar {} to {}", self.rows.len(), name, start, end);
        self.rows.push(Row {
            name,
            source: chord.clone(),
            chord,
            start,
            end,
            state: RowState::NoRhythm,
            has_bass: false,
        });
        self.rows.len() - 1
    }

    /// Builds the chord called `name` in octave `pitch` and adds it as a row.
    pub fn add_named_chord(&mut self, name: &str, pitch: i32) -> Result<usize, EngineError> {
        let chord = self.theory.build(name, pitch)?;
        Ok(self.add_chord(chord, Some(name), None, None))
    }

    /// Replaces the table with a fixed jazz progression, one bar per chord.
    pub fn load_preset_chords(&mut self) -> Result<(), EngineError> {
        self.rows.clear();
        for &(name, pitch, inversion) in PRESET_CHORDS {
            let chord = self.theory.build(name, pitch)?.inversion(inversion);
            self.add_chord(chord, Some(name), None, None);
        }
        Ok(())
    }

    /// Plays every selected row's source chord to `rhythm`, replacing
    /// whatever the row played before. `bars` defaults to each row's span.
    pub fn apply_rhythm(
        &mut self,
        rhythm: &str,
        bars: Option<f64>,
        indices: Option<&[usize]>,
        options: &RhythmOptions,
    ) -> Result<(), EngineError> {
        let selected = self.select(indices)?;

        let mut resolved = Vec::with_capacity(selected.len());
        for &index in &selected {
            let row = &self.rows[index];
            let bars = bars.unwrap_or_else(|| row.bars());
            resolved.push(rhythm::resolve(rhythm, bars, &row.source, options)?);
        }

        for (index, chord) in selected.into_iter().zip(resolved) {
            self.replace(index, chord, RowState::RhythmApplied);
        }
        Ok(())
    }

    /// Arpeggiates every selected row's source chord, replacing whatever the
    /// row played before.
    ///
    /// Pattern sets are picked per row by `mode` from `patterns`, or from
    /// the built-in variants when none are given. Each pattern is clamped to
    /// the voices of the row's named chord before it is applied.
    pub fn apply_patterns<R: Rng + ?Sized>(
        &mut self,
        patterns: Option<&[PatternSet]>,
        indices: Option<&[usize]>,
        mode: SampleMode,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        let sets: Vec<PatternSet> = match patterns {
            Some(patterns) => patterns.to_vec(),
            None => PATTERN_VARIANTS
                .iter()
                .map(|variant| {
                    PatternSet::new(variant.pattern.to_vec(), variant.intervals.to_vec())
                })
                .collect(),
        };
        if sets.is_empty() {
            return Err(EngineError::EmptyPalette { palette: "pattern" });
        }
        for (index, set) in sets.iter().enumerate() {
            if set.pattern.len() != set.intervals.len() {
                return Err(EngineError::PatternSetLength {
                    index,
                    pattern: set.pattern.len(),
                    intervals: set.intervals.len(),
                });
            }
        }

        let selected = self.select(indices)?;

        let mut resolved = Vec::with_capacity(selected.len());
        for &index in &selected {
            let set = match mode {
                SampleMode::RoundRobin => &sets[index % sets.len()],
                SampleMode::Random => &sets[rng.gen_range(0..sets.len())],
            };

            let row = &self.rows[index];
            let voices = self
                .theory
                .build(&row.name, row.source.lowest_note().map_or(4, |note| note.octave()))
                .map(|reference| reference.len())
                .unwrap_or_else(|_| row.source.len());
            let clamped = pattern::clamp_pattern(&set.pattern, voices);

            let chord = pattern::apply(&row.source, &clamped, &set.intervals)?;
            resolved.push(legato::normalize(&chord));
        }

        for (index, chord) in selected.into_iter().zip(resolved) {
            self.replace(index, chord, RowState::PatternApplied);
        }
        Ok(())
    }

    /// Plays a bass line under every selected row, on top of what the row
    /// already plays.
    ///
    /// The bass note is the row's lowest source note moved by
    /// `options.octave_offset` octaves. Accented bass lines bounce between
    /// fifths and octaves on their quiet onsets.
    pub fn apply_bass(
        &mut self,
        indices: Option<&[usize]>,
        options: &BassOptions,
    ) -> Result<(), EngineError> {
        let selected = self.select(indices)?;
        let pattern = options
            .rhythm
            .as_deref()
            .unwrap_or(RHYTHM_VARIANTS[0].rhythm);
        let rhythm_options = if options.accent {
            RhythmOptions::accented(options.high_volume, options.low_volume)
                .with_bounce(Bounce::Alternating)
        } else {
            RhythmOptions::default()
        };

        let mut lines = Vec::with_capacity(selected.len());
        for &index in &selected {
            let row = &self.rows[index];
            let root = row.source.lowest_note().ok_or(EngineError::EmptyChord)?;
            let bass = Chord::single(root.transposed(12 * options.octave_offset), 1.0);
            lines.push(rhythm::resolve(pattern, row.bars(), &bass, &rhythm_options)?);
        }

        for (index, line) in selected.into_iter().zip(lines) {
            let row = &mut self.rows[index];
            row.chord = row.chord.merge(&line);
            row.has_bass = true;
        }
        Ok(())
    }

    /// Makes every row last exactly its declared span, ringing out its final
    /// onset and cutting anything past the end.
    pub fn reconcile_length(&mut self) {
        for row in &mut self.rows {
            row.chord = row.chord.reconciled(row.bars());
        }
    }

    pub fn summaries(&self) -> Vec<RowSummary> {
        self.rows.iter().map(RowSummary::from).collect()
    }

    /// Every row placed at its start bar, as one chord.
    pub fn render(&self) -> Chord {
        let mut events: Vec<(f64, Note)> = self
            .rows
            .iter()
            .flat_map(|row| {
                row.chord
                    .onsets()
                    .into_iter()
                    .map(move |onset| row.start + onset)
                    .zip(row.chord.notes.iter().copied())
            })
            .collect();
        events.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let end = self
            .rows
            .iter()
            .map(|row| row.end.max(row.start + row.chord.bars()))
            .fold(0.0, f64::max);

        chord::from_timeline(events, end)
    }

    pub fn to_track(&self, name: &str, instrument: u8, channel: u8) -> Track {
        let mut track = Track {
            time_signature: Some(self.time_signature),
            ..Track::new(name, self.render(), instrument, channel)
        };
        track.set_channel(channel);
        track
    }

    fn select(&self, indices: Option<&[usize]>) -> Result<Vec<usize>, EngineError> {
        let selected: Vec<usize> = match indices {
            Some(indices) => indices.to_vec(),
            None => (0..self.rows.len()).collect(),
        };
        if selected.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        if let Some(&index) = selected.iter().find(|&&index| index >= self.rows.len()) {
            return Err(EngineError::RowOutOfRange {
                index,
                rows: self.rows.len(),
            });
        }
        Ok(selected)
    }

    fn replace(&mut self, index: usize, chord: Chord, state: RowState) {
        let row = &mut self.rows[index];
        if row.has_bass {
            warn!("Row {} (`{}`) loses its bass line", index, row.name);
        }
        row.chord = chord;
        row.state = state;
        row.has_bass = false;
    }

    fn detect_name(&self, chord: &Chord) -> String {
        let description = self.theory.detect(&chord.notes);
        match chord.lowest_note() {
            Some(lowest) => Detection::parse(&description, &lowest)
                .map(|detection| detection.name())
                .unwrap_or(description),
            None => description,
        }
    }
}
