use serde::{Deserialize, Serialize};

use crate::chord::Chord;
use crate::error::EngineError;

/// Starts a new onset.
pub const BEAT: &str = "b";
/// Holds the previous onset, lengthening its notes.
pub const SUSTAIN: &str = "-";

/// Token length assumed by [`fit_template`] unless told otherwise.
pub const TEMPLATE_STEP: f64 = 1.0 / 8.0;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct RhythmVariant {
    pub rhythm: &'static str,
    pub bars: f64,
}

pub const RHYTHM_VARIANTS: &[RhythmVariant] = &[
    RhythmVariant {
        rhythm: "b b b b b b b b",
        bars: 1.0,
    },
    RhythmVariant {
        rhythm: "b 0 0 b 0 b 0 b 0 b b 0 b 0 b 0",
        bars: 2.0,
    },
    RhythmVariant {
        rhythm: "b 0 0 b 0 b b 0",
        bars: 1.0,
    },
];

/// Transposition applied to the quiet onsets of an accented rhythm.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bounce {
    Off,
    /// A fifth, then an octave, then a fifth again.
    Alternating,
    Octave,
}

impl Default for Bounce {
    fn default() -> Self {
        Bounce::Off
    }
}

impl Bounce {
    fn semitones(&self, quiet_onset: usize) -> i32 {
        match self {
            Bounce::Off => 0,
            Bounce::Alternating if quiet_onset % 2 == 0 => 7,
            Bounce::Alternating => 12,
            Bounce::Octave => 12,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RhythmOptions {
    /// Turn every token into an onset, quieter where the token was not a beat.
    pub accent: bool,
    pub high_volume: u8,
    pub low_volume: u8,
    pub bounce: Bounce,
}

impl Default for RhythmOptions {
    fn default() -> Self {
        RhythmOptions {
            accent: false,
            high_volume: 100,
            low_volume: 80,
            bounce: Bounce::Off,
        }
    }
}

impl RhythmOptions {
    pub fn accented(high_volume: u8, low_volume: u8) -> Self {
        RhythmOptions {
            accent: true,
            high_volume,
            low_volume,
            bounce: Bounce::Off,
        }
    }

    pub fn with_bounce(self, bounce: Bounce) -> Self {
        RhythmOptions { bounce, ..self }
    }
}

/// Plays `source` to the rhythm described by `rhythm`, spread evenly over
/// `bars`.
///
/// Every `b` token strikes all of the source's notes together. Other tokens
/// lengthen the gap after the previous onset; `-` also lets its notes ring
/// on. Tokens before the first beat become leading silence.
pub fn resolve(
    rhythm: &str,
    bars: f64,
    source: &Chord,
    options: &RhythmOptions,
) -> Result<Chord, EngineError> {
    let tokens: Vec<&str> = rhythm.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(EngineError::EmptyRhythm {
            rhythm: rhythm.to_owned(),
        });
    }
    if !(bars > 0.0) {
        return Err(EngineError::InvalidBars { bars });
    }
    if source.is_empty() {
        return Err(EngineError::EmptyChord);
    }
    if options.accent && options.low_volume >= options.high_volume {
        return Err(EngineError::AccentVolumes {
            low: options.low_volume,
            high: options.high_volume,
        });
    }

    let step = bars / tokens.len() as f64;
    let voices = source.len();

    let mut chord = Chord::default();
    let mut onset_start: Option<usize> = None;
    let mut quiet_onsets = 0;

    for token in tokens {
        let is_beat = token == BEAT;

        if is_beat || options.accent {
            let (volume, semitones) = if !options.accent {
                (None, 0)
            } else if is_beat {
                (Some(options.high_volume), 0)
            } else {
                let semitones = options.bounce.semitones(quiet_onsets);
                quiet_onsets += 1;
                (Some(options.low_volume), semitones)
            };

            onset_start = Some(chord.len());
            for (index, note) in source.notes.iter().enumerate() {
                let mut note = note.transposed(semitones).with_duration(step);
                if let Some(volume) = volume {
                    note.volume = volume;
                }
                chord.notes.push(note);
                chord
                    .intervals
                    .push(if index + 1 == voices { step } else { 0.0 });
            }
            continue;
        }

        match onset_start {
            None => chord.start_time += step,
            Some(start) => {
                if let Some(last) = chord.intervals.last_mut() {
                    *last += step;
                }
                if token == SUSTAIN {
                    for note in &mut chord.notes[start..] {
                        note.duration += step;
                    }
                }
            }
        }
    }

    Ok(chord)
}

/// Stretches or truncates `template` to cover `bars`, with every token
/// lasting `step` bars. The template repeats whole as many times as fits and
/// the rest is filled with its opening tokens.
pub fn fit_template(template: &str, bars: f64, step: f64) -> Result<String, EngineError> {
    let tokens: Vec<&str> = template.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(EngineError::EmptyRhythm {
            rhythm: template.to_owned(),
        });
    }
    if !(bars > 0.0) || !(step > 0.0) {
        return Err(EngineError::InvalidBars { bars });
    }

    let count = ((bars / step).round() as usize).max(1);
    if count <= tokens.len() {
        return Ok(tokens[..count].join(" "));
    }

    let mut fitted: Vec<&str> = Vec::with_capacity(count);
    for _ in 0..count / tokens.len() {
        fitted.extend(&tokens);
    }
    fitted.extend(&tokens[..count % tokens.len()]);
    Ok(fitted.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{assert_close, chord, names, note};

    fn single() -> Chord {
        chord(&["C4"], &[1.0])
    }

    #[test]
    fn rests_extend_the_previous_onset() {
        let resolved = resolve("b 0 0 b", 1.0, &single(), &RhythmOptions::default()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.intervals, vec![0.75, 0.25]);
        assert_close(resolved.bars(), 1.0);
        assert_close(resolved.notes[0].duration, 0.25);
    }

    #[test]
    fn sustains_lengthen_durations() {
        let resolved = resolve("b - - b", 1.0, &single(), &RhythmOptions::default()).unwrap();
        assert_eq!(resolved.intervals, vec![0.75, 0.25]);
        assert_close(resolved.notes[0].duration, 0.75);
    }

    #[test]
    fn beats_strike_every_voice() {
        let triad = Chord::stacked(vec![note("C4"), note("E4"), note("G4")], 1.0);
        let resolved = resolve("b b", 2.0, &triad, &RhythmOptions::default()).unwrap();
        assert_eq!(resolved.intervals, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_close(resolved.bars(), 2.0);
    }

    #[test]
    fn leading_rests_become_silence() {
        let resolved = resolve("0 0 b b", 1.0, &single(), &RhythmOptions::default()).unwrap();
        assert_close(resolved.start_time, 0.5);
        assert_close(resolved.bars(), 1.0);
    }

    #[test]
    fn every_length_spans_the_requested_bars() {
        for rhythm in &["b", "b 0", "0 b 0", "b b b b b b b", "0 0 0", "b - 0 b - 0"] {
            for &bars in &[0.5, 1.0, 3.0] {
                let resolved = resolve(rhythm, bars, &single(), &RhythmOptions::default()).unwrap();
                assert_close(resolved.bars(), bars);
            }
        }
    }

    #[test]
    fn accent_turns_rests_into_quiet_onsets() {
        let options = RhythmOptions::accented(100, 60);
        let resolved = resolve("b 0 - b", 1.0, &single(), &options).unwrap();
        let volumes: Vec<u8> = resolved.notes.iter().map(|note| note.volume).collect();
        assert_eq!(volumes, vec![100, 60, 60, 100]);
        assert_eq!(resolved.intervals, vec![0.25; 4]);
    }

    #[test]
    fn accent_needs_distinct_volumes() {
        let options = RhythmOptions::accented(60, 60);
        assert_eq!(
            resolve("b 0", 1.0, &single(), &options),
            Err(EngineError::AccentVolumes { low: 60, high: 60 })
        );
    }

    #[test]
    fn bounce_moves_quiet_onsets() {
        let options = RhythmOptions::accented(100, 50).with_bounce(Bounce::Alternating);
        let resolved = resolve("b 0 0 0", 1.0, &single(), &options).unwrap();
        assert_eq!(names(&resolved), vec!["C4", "G4", "C5", "G4"]);

        let options = RhythmOptions::accented(100, 50).with_bounce(Bounce::Octave);
        let resolved = resolve("b 0", 1.0, &single(), &options).unwrap();
        assert_eq!(names(&resolved), vec!["C4", "C5"]);
    }

    #[test]
    fn empty_rhythms_are_rejected() {
        let error = resolve("   ", 1.0, &single(), &RhythmOptions::default()).unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::Configuration);
        assert!(resolve("b", 0.0, &single(), &RhythmOptions::default()).is_err());
    }

    #[test]
    fn templates_repeat_and_truncate() {
        assert_eq!(fit_template("b 0 b", 0.25, TEMPLATE_STEP).unwrap(), "b 0");
        assert_eq!(
            fit_template("b 0 b", 1.0, TEMPLATE_STEP).unwrap(),
            "b 0 b b 0 b b 0"
        );
        assert_eq!(fit_template("b b", 0.01, TEMPLATE_STEP).unwrap(), "b");
        assert!(fit_template("", 1.0, TEMPLATE_STEP).is_err());
    }

    #[test]
    fn presets_resolve() {
        for variant in RHYTHM_VARIANTS {
            let resolved = resolve(
                variant.rhythm,
                variant.bars,
                &single(),
                &RhythmOptions::default(),
            )
            .unwrap();
            assert_close(resolved.bars(), variant.bars);
        }
    }
}
