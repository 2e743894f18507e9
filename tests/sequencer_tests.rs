extern crate chordsmith;

#[macro_use]
extern crate pretty_assertions;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use chordsmith::arrangement::{Arrangement, TimeSignature};
use chordsmith::midi_generation::{generate_midi, read_midi};
use chordsmith::rhythm::RhythmOptions;
use chordsmith::sequencer::data::{BassOptions, RowState, SampleMode};
use chordsmith::{ChordEnhancer, MidiGenerationOptions};

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-6
}

fn enhanced_presets(seed: u64) -> ChordEnhancer {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut enhancer = ChordEnhancer::new();
    enhancer.load_preset_chords().unwrap();

    enhancer
        .apply_rhythm(
            "b 0 0 b 0 b b 0",
            None,
            Some(&[0, 1, 2, 3]),
            &RhythmOptions::accented(110, 70),
        )
        .unwrap();
    enhancer
        .apply_patterns(None, Some(&[4, 5, 6, 7]), SampleMode::Random, &mut rng)
        .unwrap();
    enhancer.apply_bass(None, &BassOptions::default()).unwrap();
    enhancer.reconcile_length();
    enhancer
}

#[test]
fn presets_are_enhanced_row_by_row() {
    let enhancer = enhanced_presets(9);

    let states: Vec<RowState> = enhancer.rows().iter().map(|row| row.state).collect();
    assert_eq!(
        states,
        vec![
            RowState::RhythmApplied,
            RowState::RhythmApplied,
            RowState::RhythmApplied,
            RowState::RhythmApplied,
            RowState::PatternApplied,
            RowState::PatternApplied,
            RowState::PatternApplied,
            RowState::PatternApplied,
        ]
    );
    assert!(enhancer.rows().iter().all(|row| row.has_bass));

    for row in enhancer.rows() {
        assert!(close(row.chord.bars(), row.end - row.start));
    }
}

#[test]
fn accented_rows_are_quieter_off_the_beat() {
    let enhancer = enhanced_presets(9);
    let row = &enhancer.rows()[0];
    let voices = row.source.len();

    let onsets = row.chord.onsets();
    let chord_notes: Vec<_> = row
        .chord
        .notes
        .iter()
        .zip(&onsets)
        .filter(|(note, _)| note.degree >= row.source.lowest().unwrap())
        .collect();
    assert_eq!(chord_notes.len(), voices * 8);

    for (note, &onset) in chord_notes {
        let token = (onset * 8.0).round() as usize;
        let expected = if [0, 3, 5, 6].contains(&token) { 110 } else { 70 };
        assert_eq!(note.volume, expected, "token {}", token);
    }
}

#[test]
fn the_same_seed_renders_the_same_table() {
    assert_eq!(enhanced_presets(21).render(), enhanced_presets(21).render());
}

#[test]
fn summaries_serialize_without_notes() {
    let enhancer = enhanced_presets(1);
    let json = serde_json::to_value(enhancer.summaries()).unwrap();

    assert_eq!(json[0]["name"], "Fmaj7");
    assert_eq!(json[0]["state"], "rhythm_applied");
    assert_eq!(json[7]["state"], "pattern_applied");
    assert_eq!(json[7]["has_bass"], true);
    assert!(json[0].get("chord").is_none());
}

#[test]
fn the_table_plays_as_one_track() {
    let mut enhancer = enhanced_presets(4);
    enhancer.set_time_signature(TimeSignature { beats: 4, unit: 4 });

    let mut arrangement = Arrangement::new(96);
    arrangement.add_track(0, enhancer.to_track("enhanced", 4, 1));

    let midi = generate_midi(&arrangement, &MidiGenerationOptions::default()).unwrap();
    let decoded = read_midi(&midi).unwrap();

    let track = &decoded.tracks_at(0)[0];
    assert_eq!(track.name, "enhanced");
    assert_eq!(track.instrument, 4);
    assert_eq!(track.channel, 1);
    assert_eq!(track.chord.len(), enhancer.render().len());
    assert!(close(track.chord.bars(), 8.0));
}
