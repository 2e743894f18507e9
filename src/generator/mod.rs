pub mod data;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use self::data::*;

use crate::arrangement::{Arrangement, Track};
use crate::chord::{Chord, EPSILON};
use crate::error::EngineError;
use crate::legato;
use crate::notes::Note;
use crate::pattern;
use crate::reconstruct::reference_chord;
use crate::rhythm::{self, Bounce, RhythmOptions, RHYTHM_VARIANTS, TEMPLATE_STEP};
use crate::sequencer::data::SampleMode;
use crate::theory::{MusicTheory, Scale, StandardTheory};

const MAX_HARMONY_NOTES: usize = 3;

/// Writes a melody, chords and a bass line over a chord list, one chord at
/// a time, until the configured length is reached.
///
/// The chord list comes either from a progression of scale degrees or from
/// chords added one by one. All three parts advance together, so each
/// chord's melody and bass last exactly as long as the chord.
#[derive(Debug, Clone)]
pub struct PopGenerator<T: MusicTheory = StandardTheory> {
    theory: T,
    pub config: GeneratorConfig,
    scale: Option<Scale>,
    chords: Vec<Chord>,
    progression: Option<Vec<usize>>,
    chord_index: usize,
    parts: GeneratedParts,
}

impl PopGenerator<StandardTheory> {
    pub fn new(scale: Option<Scale>, config: GeneratorConfig) -> Self {
        PopGenerator::with_theory(StandardTheory, scale, config)
    }
}

impl<T: MusicTheory> PopGenerator<T> {
    /// Minor scales are replaced by their relative major.
    pub fn with_theory(theory: T, scale: Option<Scale>, config: GeneratorConfig) -> Self {
        PopGenerator {
            theory,
            config,
            scale: scale.map(|scale| scale.relative_major()),
            chords: Vec::new(),
            progression: None,
            chord_index: 0,
            parts: GeneratedParts::default(),
        }
    }

    pub fn scale(&self) -> Option<&Scale> {
        self.scale.as_ref()
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    /// The progression the chord list was built from, as scale degrees.
    pub fn progression(&self) -> Option<String> {
        self.progression.as_ref().map(|degrees| {
            degrees
                .iter()
                .map(|degree| degree.to_string())
                .collect::<String>()
        })
    }

    pub fn parts(&self) -> &GeneratedParts {
        &self.parts
    }

    /// Builds the chord list from `progression`, a string of scale degrees
    /// such as `"6451"`. Without one, a preset progression is picked.
    pub fn set_chord_progression<R: Rng + ?Sized>(
        &mut self,
        progression: Option<&str>,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        let scale = self.scale.ok_or(EngineError::MissingScale)?;

        let progression = match progression {
            Some(progression) => progression.trim().to_owned(),
            None => PRESET_PROGRESSIONS
                .choose(rng)
                .map(|&progression| progression.to_owned())
                .unwrap_or_default(),
        };
        let invalid = || EngineError::InvalidProgression {
            progression: progression.clone(),
        };

        let degrees = progression
            .chars()
            .map(|digit| match digit.to_digit(10) {
                Some(degree @ 1..=7) => Ok(degree as usize),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<usize>, EngineError>>()?;
        if degrees.is_empty() {
            return Err(invalid());
        }

        let n_notes = *self
            .config
            .chord_notes_num
            .choose(rng)
            .ok_or(EngineError::EmptyPalette {
                palette: "chord size",
            })?;

        self.chords = degrees
            .iter()
            .map(|&degree| scale.chord(degree, n_notes, self.config.chord_duration))
            .collect();
        self.progression = Some(degrees);

        info!("Chord progression: {}", progression);
        Ok(())
    }

    /// Adds a chord built from `name` and arpeggiated by `pattern`. An empty
    /// pattern plays the chord as a block for the configured duration.
    ///
    /// Custom chords replace any progression.
    pub fn add_chord(
        &mut self,
        name: &str,
        pitch: i32,
        pattern: &[f64],
        intervals: &[f64],
    ) -> Result<(), EngineError> {
        if pattern.len() != intervals.len() {
            return Err(EngineError::PatternLength {
                pattern: pattern.len(),
                intervals: intervals.len(),
            });
        }

        if self.progression.take().is_some() {
            info!("Chord progression cleared by custom chords");
            self.chords.clear();
        }

        let reference = reference_chord(&self.theory, name, pitch)?;
        let chord = if pattern.is_empty() {
            Chord::stacked(reference.notes, self.config.chord_duration)
        } else {
            legato::normalize(&pattern::apply(&reference, pattern, intervals)?)
        };

        debug!("Added chord {} at index {}", chord, self.chords.len());
        self.chords.push(chord);
        Ok(())
    }

    pub fn set_bass_rhythms(&mut self, rhythms: Vec<String>, mode: SampleMode) {
        self.config.bass_rhythms = if rhythms.is_empty() {
            vec![RHYTHM_VARIANTS[0].rhythm.to_owned()]
        } else {
            rhythms
        };
        self.config.bass_sample_mode = mode;
    }

    /// Plays every chord rooted on the fifth degree as a triad with the root
    /// doubled an octave up.
    pub fn replace_fifth_chords(&mut self) -> Result<(), EngineError> {
        let scale = self.scale.ok_or(EngineError::MissingScale)?;
        let fifth = scale.degree(5);
        let span = self.config.chord_duration;

        for chord in &mut self.chords {
            let root = match chord.notes.first() {
                Some(root) if root.pitch_class() == fifth.pitch_class() => *root,
                _ => continue,
            };

            let triad = self.theory.build(root.name(), root.octave())?;
            *chord = legato::normalize(&pattern::apply(
                &triad,
                &[1.0, 2.0, 3.0, 1.1],
                &[0.0, 0.0, 0.0, span],
            )?);
        }
        Ok(())
    }

    /// Reverses each chord's note order with the given chance.
    pub fn apply_reverse<R: Rng + ?Sized>(&mut self, probability: f64, rng: &mut R) {
        let probability = probability.max(0.0).min(1.0);
        for chord in &mut self.chords {
            if rng.gen_bool(probability) {
                *chord = chord.reversed();
            }
        }
    }

    /// Drops the given 1-based voices from every chord.
    pub fn apply_omission(&mut self, voices: &[usize]) {
        for chord in &mut self.chords {
            *chord = chord.omit(voices);
        }
    }

    /// Inverts each chord `inversion` times with the given chance.
    pub fn apply_inversion<R: Rng + ?Sized>(
        &mut self,
        inversion: usize,
        probability: f64,
        rng: &mut R,
    ) {
        let probability = probability.max(0.0).min(1.0);
        for chord in &mut self.chords {
            if rng.gen_bool(probability) {
                *chord = chord.inversion(inversion);
            }
        }
    }

    fn current_chord(&self) -> Result<&Chord, EngineError> {
        self.chords
            .get(self.chord_index % self.chords.len().max(1))
            .ok_or(EngineError::NoChords)
    }

    /// The current chord, strummed by a gap picked from the configured
    /// intervals. Custom chords are played as they were added.
    pub fn generate_chord<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Chord, EngineError> {
        let chord = self.current_chord()?;
        if self.progression.is_none() {
            return Ok(chord.clone());
        }

        match self.config.selected_chord_intervals.choose(rng) {
            Some(&gap) if gap > EPSILON => Ok(strum(chord, gap)),
            _ => Ok(chord.clone()),
        }
    }

    /// The tonic of the current chord played to a bass rhythm stretched over
    /// the chord's length.
    pub fn generate_bass<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Chord, EngineError> {
        let chord = self.current_chord()?;
        let span = chord.bars();

        let tonic = match (&self.progression, &self.scale) {
            (Some(degrees), Some(scale)) => {
                let degree = degrees[self.chord_index % degrees.len()];
                self.theory.scale_degree(scale, degree)
            }
            _ => chord.lowest_note().ok_or(EngineError::EmptyChord)?,
        }
        .with_octave(self.config.bass_octave);

        let rhythms = &self.config.bass_rhythms;
        let template = match self.config.bass_sample_mode {
            _ if rhythms.is_empty() => RHYTHM_VARIANTS[0].rhythm,
            SampleMode::RoundRobin => rhythms[self.chord_index % rhythms.len()].as_str(),
            SampleMode::Random => rhythms[rng.gen_range(0..rhythms.len())].as_str(),
        };
        let fitted = rhythm::fit_template(template, span, TEMPLATE_STEP)?;

        let options = if self.config.bass_accent {
            RhythmOptions::accented(self.config.bass_high_volume, self.config.bass_low_volume)
                .with_bounce(Bounce::Alternating)
        } else {
            RhythmOptions::default()
        };
        rhythm::resolve(&fitted, span, &Chord::single(tonic, 1.0), &options)
    }

    /// A random walk over chord tones and passing tones lasting exactly as
    /// long as the current chord.
    pub fn generate_melody<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Chord, EngineError> {
        let chord = self.current_chord()?;
        let durations: Vec<f64> = self
            .config
            .melody_durations
            .iter()
            .copied()
            .filter(|&duration| duration > EPSILON)
            .collect();
        if durations.is_empty() {
            return Err(EngineError::EmptyPalette {
                palette: "melody duration",
            });
        }

        let scale_notes = self.scale.map(|scale| scale.notes()).unwrap_or_default();
        let chord_classes = chord.pitch_classes();
        let passing: Vec<Note> = scale_notes
            .iter()
            .copied()
            .filter(|note| !chord_classes.contains(&note.pitch_class()))
            .collect();
        let mixed: Vec<Note> = chord.notes.iter().chain(&scale_notes).copied().collect();
        let variance = self.config.variance.max(0.0).min(1.0);

        let mut melody = Chord::default();
        let mut remainder = chord.bars();

        while remainder > EPSILON {
            let pool = if self.progression.is_none() {
                &mixed
            } else if !passing.is_empty() && rng.gen_bool(variance) {
                &passing
            } else {
                &chord.notes
            };
            let picked = *pool.choose(rng).ok_or(EngineError::EmptyChord)?;

            let duration = durations
                .choose(rng)
                .copied()
                .unwrap_or(remainder)
                .min(remainder);
            remainder -= duration;

            let note = picked
                .with_octave(self.config.melody_octave)
                .with_duration(duration);

            if self.config.harmonize {
                let mut harmony =
                    harmonize_melody(note, chord, self.config.num_harmony_notes, rng)?;
                if let Some(last) = harmony.intervals.last_mut() {
                    *last = duration;
                }
                melody.append(harmony);
            } else {
                melody.notes.push(note);
                melody.intervals.push(duration);
            }
        }

        Ok(melody)
    }

    /// Generates every part from the first chord until the configured length
    /// is reached, and arranges them as melody, chords and bass on channels
    /// 0, 1 and 2.
    pub fn generate_all<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Arrangement, EngineError> {
        if self.chords.is_empty() {
            return Err(EngineError::NoChords);
        }

        self.chord_index = 0;
        self.parts = GeneratedParts::default();
        let mut length_count = 0.0;

        while length_count < f64::from(self.config.length) - EPSILON {
            let chord = self.generate_chord(rng)?;
            let span = chord.bars();
            if !(span > EPSILON) {
                return Err(EngineError::InvalidBars { bars: span });
            }
            debug!(
                "Bar {}: chord {} of {}",
                length_count,
                self.chord_index + 1,
                self.chords.len()
            );

            let bass = self.generate_bass(rng)?;
            let melody = self.generate_melody(rng)?;

            self.parts.chords.append(chord);
            self.parts.bass.append(bass);
            self.parts.melody.append(melody);
            length_count += span;

            self.chord_index = (self.chord_index + 1) % self.chords.len();
        }

        Ok(self.arrange())
    }

    fn arrange(&self) -> Arrangement {
        let config = &self.config;
        let mut arrangement = Arrangement::new(config.bpm);

        let tracks = vec![
            ("melody", &self.parts.melody, config.melody_instrument, config.melody_volume),
            ("chords", &self.parts.chords, config.chord_instrument, config.chord_volume),
            ("bass", &self.parts.bass, config.bass_instrument, config.bass_volume),
        ];
        for (channel, (name, chord, instrument, volume)) in tracks.into_iter().enumerate() {
            let mut track = Track {
                key: self.scale,
                ..Track::new(name, chord.clone(), instrument, 0).with_volume(volume)
            };
            track.set_channel(channel as u8);
            arrangement.add_track(0, track);
        }

        arrangement
    }
}

/// Spreads a block chord's onsets `gap` bars apart without changing its
/// length. The gap shrinks when the chord is too short to fit it, and every
/// note rings until the chord ends.
fn strum(chord: &Chord, gap: f64) -> Chord {
    let count = chord.len();
    let span: f64 = chord.intervals.iter().sum();
    if count < 2 || !(span > EPSILON) {
        return chord.clone();
    }

    let gap = gap.min(span / count as f64);
    let notes = chord
        .notes
        .iter()
        .enumerate()
        .map(|(index, note)| note.with_duration(span - gap * index as f64))
        .collect();
    let intervals = (0..count)
        .map(|index| {
            if index + 1 == count {
                span - gap * (count - 1) as f64
            } else {
                gap
            }
        })
        .collect();

    Chord {
        notes,
        intervals,
        start_time: chord.start_time,
    }
}

/// Stacks `count` other tones of `chord` beneath `melody`, all starting
/// together. The melody note comes last.
pub fn harmonize_melody<R: Rng + ?Sized>(
    melody: Note,
    chord: &Chord,
    count: usize,
    rng: &mut R,
) -> Result<Chord, EngineError> {
    if count < 1 || count > MAX_HARMONY_NOTES {
        return Err(EngineError::HarmonyCount { count });
    }

    let mut available: Vec<Note> = chord
        .notes
        .iter()
        .copied()
        .filter(|note| note.pitch_class() != melody.pitch_class())
        .collect();
    available.sort_by_key(Note::pitch_class);
    available.dedup_by_key(|note| note.pitch_class());

    let mut harmony: Vec<Note> = available
        .choose_multiple(rng, count.min(available.len()))
        .map(|note| {
            let mut degree = note.degree;
            while degree >= melody.degree {
                degree -= 12;
            }
            while degree + 12 < melody.degree {
                degree += 12;
            }
            Note { degree, ..melody }
        })
        .collect();
    harmony.sort_by_key(|note| note.degree);
    harmony.push(melody);

    let count = harmony.len();
    let intervals = (0..count)
        .map(|index| if index + 1 == count { melody.duration } else { 0.0 })
        .collect();
    Chord::new(harmony, intervals)
}
