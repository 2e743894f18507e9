use serde::{Deserialize, Serialize};

use crate::chord::Chord;

/// How many bars a row lasts when it is added without an end.
pub const DEFAULT_ROW_SPAN: f64 = 1.0;

/// Which resolver last produced a row's notes. Rhythms and patterns always
/// start again from the row's source chord, so only the latest one counts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    NoRhythm,
    RhythmApplied,
    PatternApplied,
}

/// How a row picks from a list of choices.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Row `i` takes choice `i % len`.
    RoundRobin,
    Random,
}

impl Default for SampleMode {
    fn default() -> Self {
        SampleMode::RoundRobin
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    /// The chord as it was added, before any rhythm or pattern.
    pub source: Chord,
    pub chord: Chord,
    pub start: f64,
    pub end: f64,
    pub state: RowState,
    pub has_bass: bool,
}

impl Row {
    pub fn bars(&self) -> f64 {
        self.end - self.start
    }
}

/// A row without its notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSummary {
    pub name: String,
    pub start: f64,
    pub end: f64,
    pub state: RowState,
    pub has_bass: bool,
    pub notes: usize,
    pub bars: f64,
}

impl<'a> From<&'a Row> for RowSummary {
    fn from(row: &'a Row) -> Self {
        RowSummary {
            name: row.name.clone(),
            start: row.start,
            end: row.end,
            state: row.state,
            has_bass: row.has_bass,
            notes: row.chord.len(),
            bars: row.chord.bars(),
        }
    }
}

/// A pattern and the intervals it is played with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSet {
    pub pattern: Vec<f64>,
    pub intervals: Vec<f64>,
}

impl PatternSet {
    pub fn new(pattern: Vec<f64>, intervals: Vec<f64>) -> Self {
        PatternSet { pattern, intervals }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BassOptions {
    /// Defaults to steady eighth notes.
    pub rhythm: Option<String>,
    pub accent: bool,
    pub high_volume: u8,
    pub low_volume: u8,
    /// Whole octaves to move the bass note from the row's lowest note.
    pub octave_offset: i32,
}

impl Default for BassOptions {
    fn default() -> Self {
        BassOptions {
            rhythm: None,
            accent: false,
            high_volume: 100,
            low_volume: 80,
            octave_offset: -2,
        }
    }
}
