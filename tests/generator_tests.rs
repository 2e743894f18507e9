extern crate chordsmith;

#[macro_use]
extern crate pretty_assertions;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use chordsmith::midi_generation::{generate_midi, read_midi};
use chordsmith::theory::Scale;
use chordsmith::{GeneratorConfig, MidiGenerationOptions, PopGenerator};

fn partial_config() -> GeneratorConfig {
    serde_json::from_str(include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/test_files/generator/partial_config.json"
    )))
    .unwrap()
}

fn generate(seed: u64, scale: &str, progression: Option<&str>) -> (PopGenerator, Vec<u8>) {
    let mut rng = Pcg32::seed_from_u64(seed);
    let scale: Scale = scale.parse().unwrap();

    let mut generator = PopGenerator::new(Some(scale), partial_config());
    generator.set_chord_progression(progression, &mut rng).unwrap();
    let arrangement = generator.generate_all(&mut rng).unwrap();

    let midi = generate_midi(&arrangement, &MidiGenerationOptions::default()).unwrap();
    (generator, midi)
}

#[test]
fn partial_configs_keep_their_defaults() {
    let config = partial_config();
    assert_eq!(config.length, 8);
    assert!(config.harmonize);
    assert_eq!(config.bpm, 120);
    assert_eq!(config.melody_instrument, 25);
    assert_eq!(config.melody_octave, 5);
    assert_eq!(config.selected_chord_intervals, vec![0.125]);
}

#[test]
fn the_same_seed_generates_the_same_song() {
    let (_, first) = generate(17, "D major", None);
    let (_, second) = generate(17, "D major", None);
    assert_eq!(first, second);
}

#[test]
fn all_parts_end_together() {
    let (generator, _) = generate(5, "E minor", Some("6451"));
    let parts = generator.parts();

    for part in &[&parts.melody, &parts.chords, &parts.bass] {
        assert!((part.bars() - 8.0).abs() < 1e-9, "part lasts {}", part.bars());
    }
}

#[test]
fn songs_play_as_three_tracks() {
    let (_, midi) = generate(8, "C major", Some("1564"));
    let decoded = read_midi(&midi).unwrap();

    assert_eq!(decoded.bpm, 120);
    let tracks: Vec<(&str, u8, u8)> = decoded
        .tracks()
        .map(|(_, track)| (track.name.as_str(), track.instrument, track.channel))
        .collect();
    assert_eq!(
        tracks,
        vec![("melody", 25, 0), ("chords", 47, 1), ("bass", 38, 2)]
    );
}

#[test]
fn bass_notes_stay_on_the_progression() {
    let (generator, _) = generate(2, "C major", Some("1564"));
    let bass = &generator.parts().bass;

    let roots: Vec<u8> = vec![0, 7, 9, 5];
    for (onset, note) in bass.onsets().iter().zip(&bass.notes) {
        let bar = onset.floor() as usize;
        let root = roots[bar % roots.len()];
        let class = note.pitch_class();
        assert!(
            class == root || class == (root + 7) % 12,
            "bar {} plays {}",
            bar,
            note
        );
        assert!(note.octave() <= 3);
    }
}

#[test]
fn melody_sits_in_its_octave() {
    let (generator, _) = generate(30, "F major", Some("1451"));
    let melody = &generator.parts().melody;

    let highest = melody.highest().unwrap();
    assert!(highest < 84, "melody reaches {}", highest);
    assert!(melody.notes.iter().any(|note| note.octave() == 5));
}
