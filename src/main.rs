use std::path::Path;

use ansi_term::Style;
use color_eyre::eyre::{eyre, Result};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use chordsmith::colors::{BLUE, CYAN, GREEN, RED, WHITE, YELLOW};
use chordsmith::deconstruct::DeconstructOptions;
use chordsmith::error::Report;
use chordsmith::pattern::PATTERN_VARIANTS;
use chordsmith::reconstruct::reference_chord;
use chordsmith::rhythm::{self, Bounce, RhythmOptions, RHYTHM_VARIANTS};
use chordsmith::theory::{Scale, StandardTheory, QUALITIES};
use chordsmith::{GeneratorConfig, MidiGenerationOptions, PlaybackOptions, PopGenerator};

#[derive(Debug, StructOpt)]
struct MidiArgs {
    #[structopt(
        short = "d",
        long = "division",
        help = "MIDI ticks per beat.",
        default_value = "480"
    )]
    ticks_per_beat: i16,

    #[structopt(
        short = "o",
        long = "output",
        help = "Output file, or stdout if not specified."
    )]
    output: Option<String>,

    #[structopt(long = "bpm", help = "Tempo in beats per minute.", default_value = "120")]
    bpm: u32,

    #[structopt(
        long = "instrument",
        help = "General MIDI program number.",
        default_value = "0"
    )]
    instrument: u8,
}

impl MidiArgs {
    fn playback(&self) -> PlaybackOptions {
        PlaybackOptions {
            bpm: self.bpm,
            instrument: self.instrument,
            channel: 0,
        }
    }

    fn options(&self) -> MidiGenerationOptions {
        MidiGenerationOptions {
            ticks_per_beat: self.ticks_per_beat,
        }
    }
}

#[derive(Debug, StructOpt)]
enum ChordsmithCommand {
    #[structopt(name = "mid", about = "Reconstruct chord record JSON into a MIDI file.")]
    Mid {
        #[structopt(help = "Input file, or stdin if not specified.")]
        input: Option<String>,

        #[structopt(flatten)]
        midi: MidiArgs,
    },

    #[structopt(name = "notes", about = "Write note group JSON as a MIDI file.")]
    Notes {
        #[structopt(help = "Input file, or stdin if not specified.")]
        input: Option<String>,

        #[structopt(flatten)]
        midi: MidiArgs,
    },

    #[structopt(
        name = "deconstruct",
        about = "Read a MIDI file back into chord record JSON."
    )]
    Deconstruct {
        #[structopt(help = "MIDI file to read.")]
        input: String,

        #[structopt(
            short = "t",
            long = "track",
            help = "Index of the melodic track to read. Drum tracks are skipped.",
            default_value = "0"
        )]
        track: usize,

        #[structopt(
            short = "r",
            long = "sample-rate",
            help = "Width of each sampled window in bars.",
            default_value = "1"
        )]
        sample_rate: f64,

        #[structopt(long = "pitch", help = "Octave to build every chord in.")]
        pitch: Option<i32>,

        #[structopt(long = "markdown", help = "Print the track's notes instead of records.")]
        markdown: bool,

        #[structopt(
            short = "o",
            long = "output",
            help = "Output file, or stdout if not specified."
        )]
        output: Option<String>,
    },

    #[structopt(name = "rhythm", about = "Play one chord to a rhythm and write it as MIDI.")]
    Rhythm {
        #[structopt(short = "c", long = "chord", help = "Chord name, e.g. `Cmaj7`.")]
        chord: String,

        #[structopt(long = "pitch", help = "Octave of the chord's root.", default_value = "4")]
        pitch: i32,

        #[structopt(
            short = "r",
            long = "rhythm",
            help = "Rhythm tokens: `b` strikes, `-` holds, anything else rests."
        )]
        rhythm: String,

        #[structopt(long = "bars", help = "Bars the rhythm spans.", default_value = "1")]
        bars: f64,

        #[structopt(long = "accent", help = "Strike on every token, quieter off the beat.")]
        accent: bool,

        #[structopt(long = "bounce", help = "Bounce quiet onsets by fifths and octaves.")]
        bounce: bool,

        #[structopt(long = "high-volume", default_value = "100")]
        high_volume: u8,

        #[structopt(long = "low-volume", default_value = "80")]
        low_volume: u8,

        #[structopt(flatten)]
        midi: MidiArgs,
    },

    #[structopt(name = "generate", about = "Generate a melody, chords and bass as MIDI.")]
    Generate {
        #[structopt(short = "s", long = "scale", help = "Scale, e.g. `C major` or `A minor`.")]
        scale: Option<String>,

        #[structopt(
            short = "p",
            long = "progression",
            help = "Scale degrees, e.g. `6451`. A preset is picked if not specified."
        )]
        progression: Option<String>,

        #[structopt(short = "l", long = "length", help = "Bars to generate.")]
        length: Option<u32>,

        #[structopt(long = "seed", help = "Seed for reproducible output.")]
        seed: Option<u64>,

        #[structopt(long = "config", help = "Generator configuration JSON file.")]
        config: Option<String>,

        #[structopt(long = "harmonize", help = "Stack chord tones under the melody.")]
        harmonize: bool,

        #[structopt(
            short = "d",
            long = "division",
            help = "MIDI ticks per beat.",
            default_value = "480"
        )]
        ticks_per_beat: i16,

        #[structopt(
            short = "o",
            long = "output",
            help = "Output file, or stdout if not specified."
        )]
        output: Option<String>,
    },

    #[structopt(name = "ref", about = "View the chords, rhythms and patterns available.")]
    Ref {
        #[structopt(subcommand)]
        subcommand: RefCommand,
    },
}

#[derive(Debug, StructOpt)]
enum RefCommand {
    #[structopt(name = "qualities", about = "View the chord qualities that can be built.")]
    Qualities,

    #[structopt(name = "rhythms", about = "View the preset rhythms.")]
    Rhythms,

    #[structopt(name = "patterns", about = "View the preset arpeggio patterns.")]
    Patterns,
}

fn main() {
    if let Err(err) = color_eyre::install() {
        eprintln!("{}", err);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chordsmith=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = ChordsmithCommand::from_args();

    if let Err(err) = run_command(command) {
        eprintln!("{}", err);
        log(*RED, "error:", "Command failed.");
        std::process::exit(1)
    }
}

fn log(color: Style, prefix: &str, message: &str) {
    eprintln!("{} {}", color.paint(prefix), WHITE.paint(message));
}

fn run_command(command: ChordsmithCommand) -> Result<()> {
    match command {
        ChordsmithCommand::Mid { input, midi } => {
            log(*CYAN, "Reconstructing", "chord records to MIDI ...");
            let source = read_input(input.as_ref())?;
            let bytes = chordsmith::records_to_midi(&source, &midi.playback(), &midi.options())
                .map_err(|err| report(&err, input.as_deref()))?;
            write_binary(&bytes, midi.output.as_ref())
        }

        ChordsmithCommand::Notes { input, midi } => {
            log(*CYAN, "Compiling", "note groups to MIDI ...");
            let source = read_input(input.as_ref())?;
            let bytes =
                chordsmith::note_groups_to_midi(&source, &midi.playback(), &midi.options())
                    .map_err(|err| report(&err, input.as_deref()))?;
            write_binary(&bytes, midi.output.as_ref())
        }

        ChordsmithCommand::Deconstruct {
            input,
            track,
            sample_rate,
            pitch,
            markdown,
            output,
        } => {
            log(*CYAN, "Deconstructing", &format!("{} ...", input));
            let bytes = std::fs::read(&input)?;

            let text = if markdown {
                let chord = chordsmith::read_midi_track(&bytes, track)
                    .map_err(|err| report(&err, Some(input.as_str())))?;
                chordsmith::record::to_markdown(&chord)
            } else {
                let options = DeconstructOptions {
                    sample_rate,
                    pitch,
                    ..Default::default()
                };
                let records = chordsmith::deconstruct_midi(&bytes, track, &options)
                    .map_err(|err| report(&err, Some(input.as_str())))?;
                log(*GREEN, "Found", &format!("{} chord records", records.len()));
                chordsmith::record::records_to_json(&records)?
            };

            write_binary(format!("{}\n", text).as_bytes(), output.as_ref())
        }

        ChordsmithCommand::Rhythm {
            chord,
            pitch,
            rhythm: tokens,
            bars,
            accent,
            bounce,
            high_volume,
            low_volume,
            midi,
        } => {
            let source = reference_chord(&StandardTheory, &chord, pitch)
                .map_err(|err| report(&err, Some(chord.as_str())))?;

            let options = RhythmOptions {
                accent,
                high_volume,
                low_volume,
                bounce: if bounce { Bounce::Alternating } else { Bounce::Off },
            };
            let resolved = rhythm::resolve(&tokens, bars, &source, &options)
                .map_err(|err| report(&err, Some(tokens.as_str())))?;
            log(
                *CYAN,
                "Resolved",
                &format!("{} notes over {} bars", resolved.len(), resolved.bars()),
            );

            let bytes =
                chordsmith::chord_to_midi(resolved, &chord, &midi.playback(), &midi.options())?;
            write_binary(&bytes, midi.output.as_ref())
        }

        ChordsmithCommand::Generate {
            scale,
            progression,
            length,
            seed,
            config,
            harmonize,
            ticks_per_beat,
            output,
        } => {
            let mut config: GeneratorConfig = match config {
                Some(path) => serde_json::from_str(&read_input(Some(&path))?)?,
                None => GeneratorConfig::default(),
            };
            if let Some(length) = length {
                config.length = length;
            }
            config.harmonize |= harmonize;
            let progression = progression.or_else(|| config.chord_progression.clone());

            let scale = scale
                .as_deref()
                .unwrap_or("C major")
                .parse::<Scale>()
                .map_err(|err| report(&err, scale.as_deref()))?;

            let mut rng = match seed {
                Some(seed) => Pcg32::seed_from_u64(seed),
                None => Pcg32::from_entropy(),
            };

            let mut generator = PopGenerator::new(Some(scale), config);
            generator
                .set_chord_progression(progression.as_deref(), &mut rng)
                .map_err(|err| report(&err, progression.as_deref()))?;
            log(
                *CYAN,
                "Generating",
                &format!(
                    "{} bars in {} over {} ...",
                    generator.config.length,
                    scale,
                    generator.progression().unwrap_or_default()
                ),
            );

            let arrangement = generator.generate_all(&mut rng)?;
            let options = MidiGenerationOptions { ticks_per_beat };
            let bytes = chordsmith::midi_generation::generate_midi(&arrangement, &options)?;
            write_binary(&bytes, output.as_ref())
        }

        ChordsmithCommand::Ref { subcommand } => {
            match subcommand {
                RefCommand::Qualities => {
                    for quality in QUALITIES {
                        println!(
                            "{:<8} {:<28} {:?}",
                            YELLOW.paint(quality.name),
                            quality.aliases.join(", "),
                            quality.intervals
                        );
                    }
                }

                RefCommand::Rhythms => {
                    for variant in RHYTHM_VARIANTS {
                        println!(
                            "{} {}",
                            BLUE.paint(format!("{} bars:", variant.bars)),
                            variant.rhythm
                        );
                    }
                }

                RefCommand::Patterns => {
                    for variant in PATTERN_VARIANTS {
                        println!(
                            "{:<12} {:?} {:?}",
                            YELLOW.paint(variant.name),
                            variant.pattern,
                            variant.intervals
                        );
                    }
                }
            }

            Ok(())
        }
    }
}

fn report(error: &chordsmith::error::EngineError, input: Option<&str>) -> color_eyre::Report {
    eyre!("{}", Report::new(error, input))
}

fn read_input<P>(input: Option<P>) -> Result<String>
where
    P: AsRef<Path>,
{
    use std::fs::File;
    use std::io::Read;

    let mut content = String::new();

    match input {
        Some(filename) => {
            File::open(filename.as_ref())?.read_to_string(&mut content)?;
        }
        None => {
            std::io::stdin().read_to_string(&mut content)?;
        }
    }

    Ok(content)
}

fn write_binary<P>(content: &[u8], output: Option<P>) -> Result<()>
where
    P: AsRef<Path>,
{
    use std::fs::File;
    use std::io::Write;

    if let Some(filename) = output {
        File::create(filename.as_ref())?.write_all(content)?;
    } else {
        std::io::stdout().write_all(content)?;
    }

    Ok(())
}
