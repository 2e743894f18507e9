pub mod data;

use std::io::Cursor;

use rimd::{
    Event, MetaCommand, MetaEvent, MidiMessage, SMFFormat, SMFWriter, Track as SmfTrack,
    TrackEvent, SMF,
};
use tracing::debug;

use self::data::*;

use crate::arrangement::{Arrangement, TimeSignature, Track};
use crate::chord::{self, EPSILON};
use crate::error::EngineError;
use crate::notes::Note;

const MICROSECONDS_PER_MIN: u32 = 60_000_000;
const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const PROGRAM_CHANGE: u8 = 0xC0;

pub fn generate_midi(
    arrangement: &Arrangement,
    options: &MidiGenerationOptions,
) -> Result<Vec<u8>, EngineError> {
    let smf = {
        let tempo = MICROSECONDS_PER_MIN / arrangement.bpm.max(1);
        let signature = arrangement.time_signature;

        let track0 = SmfTrack {
            copyright: None,
            name: None,
            events: vec![
                TrackEvent {
                    vtime: 0,
                    event: Event::Meta(MetaEvent::text_event("tempo track".into())),
                },
                TrackEvent {
                    vtime: 0,
                    event: Event::Meta(MetaEvent::tempo_setting(tempo)),
                },
                TrackEvent {
                    vtime: 0,
                    event: Event::Meta(MetaEvent::key_signature(0, 0)),
                },
                TrackEvent {
                    vtime: 0,
                    event: Event::Meta(MetaEvent::time_signature(
                        signature.beats,
                        signature.unit.max(1).trailing_zeros() as u8,
                        24,
                        8,
                    )),
                },
            ],
        };

        let mut tracks = vec![track0];
        let ticks_per_bar = f64::from(options.ticks_per_beat) * signature.quarters_per_bar();

        for (bar, track) in arrangement.tracks() {
            debug!("Encoding track `{}` from bar {}", track.name, bar);
            let channel = track.channel & 0x0F;

            let mut events = vec![
                TrackEvent {
                    vtime: 0,
                    event: Event::Meta(MetaEvent::text_event(track.name.clone())),
                },
                TrackEvent {
                    vtime: 0,
                    event: Event::Midi(MidiMessage::program_change(track.instrument, channel)),
                },
            ];
            if let Some(volume) = track.volume {
                events.push(TrackEvent {
                    vtime: 0,
                    event: Event::Midi(MidiMessage::control_change(7, volume.min(127), channel)),
                });
            }

            let split_notes = {
                let mut split_notes = Vec::new();
                let offset = f64::from(bar) * ticks_per_bar;

                for (onset, note) in track.chord.onsets().into_iter().zip(&track.chord.notes) {
                    let key = note
                        .midi()
                        .ok_or(EngineError::PitchOutOfRange { degree: note.degree })?;
                    let pos_ticks = (offset + onset * ticks_per_bar).round() as u64;
                    let len_ticks = ((note.duration * ticks_per_bar).round() as u64).max(1);
                    let velocity = note.volume.min(127);

                    split_notes.push(NoteEvent {
                        tick: pos_ticks,
                        on: true,
                        key,
                        velocity,
                        channel,
                    });
                    split_notes.push(NoteEvent {
                        tick: pos_ticks + len_ticks,
                        on: false,
                        key,
                        velocity: 0,
                        channel,
                    });
                }

                split_notes.sort_by_key(NoteEvent::sort_key);
                split_notes
            };

            let mut cursor = 0;
            for note in split_notes {
                let vtime = note.tick.saturating_sub(cursor);
                let message = if note.on {
                    MidiMessage::note_on(note.key, note.velocity, note.channel)
                } else {
                    MidiMessage::note_off(note.key, note.velocity, note.channel)
                };

                events.push(TrackEvent {
                    vtime,
                    event: Event::Midi(message),
                });

                cursor = cursor.max(note.tick);
            }

            tracks.push(SmfTrack {
                copyright: None,
                name: Some(track.name.clone()),
                events,
            });
        }

        SMF {
            format: SMFFormat::MultiTrack,
            division: options.ticks_per_beat,
            tracks,
        }
    };

    let writer = SMFWriter::from_smf(smf);

    let mut buffer = Vec::new();
    writer
        .write_all(&mut buffer)
        .map_err(|error| EngineError::Midi {
            message: error.to_string(),
        })?;

    Ok(buffer)
}

/// Reads a standard MIDI file back into tracks, all starting at bar zero.
///
/// Tempo and time signature come from the first meta events found. Tracks
/// without notes are dropped.
pub fn read_midi(bytes: &[u8]) -> Result<Arrangement, EngineError> {
    let smf = SMF::from_reader(&mut Cursor::new(bytes)).map_err(|error| EngineError::Midi {
        message: format!("{:?}", error),
    })?;

    let mut arrangement = Arrangement::default();
    for track in &smf.tracks {
        for event in &track.events {
            if let Event::Meta(meta) = &event.event {
                read_meta(meta, &mut arrangement);
            }
        }
    }

    let division = if smf.division > 0 {
        f64::from(smf.division)
    } else {
        f64::from(MidiGenerationOptions::default().ticks_per_beat)
    };
    let ticks_per_bar = division * arrangement.time_signature.quarters_per_bar();

    let mut decoded = Vec::new();
    for (index, track) in smf.tracks.iter().enumerate() {
        if let Some(track) = read_track(index, track, ticks_per_bar) {
            decoded.push(track);
        }
    }
    for track in decoded {
        arrangement.add_track(0, track);
    }

    Ok(arrangement)
}

fn read_meta(meta: &MetaEvent, arrangement: &mut Arrangement) {
    match meta.command {
        MetaCommand::TempoSetting if meta.data.len() >= 3 => {
            let tempo = (u32::from(meta.data[0]) << 16)
                | (u32::from(meta.data[1]) << 8)
                | u32::from(meta.data[2]);
            if tempo > 0 {
                let bpm = f64::from(MICROSECONDS_PER_MIN) / f64::from(tempo);
                arrangement.bpm = bpm.round() as u32;
            }
        }
        MetaCommand::TimeSignature if meta.data.len() >= 2 => {
            arrangement.time_signature = TimeSignature {
                beats: meta.data[0].max(1),
                unit: 1u8.checked_shl(u32::from(meta.data[1])).unwrap_or(4),
            };
        }
        _ => (),
    }
}

fn read_track(index: usize, track: &SmfTrack, ticks_per_bar: f64) -> Option<Track> {
    let mut name = track.name.clone();
    let mut instrument = 0;
    let mut channel = None;

    let mut open: Vec<(u8, u8, u64, u8)> = Vec::new();
    let mut timeline: Vec<(f64, Note)> = Vec::new();
    let mut tick = 0;

    for event in &track.events {
        tick += event.vtime;

        match &event.event {
            Event::Meta(meta) => {
                if name.is_none() {
                    if let MetaCommand::TextEvent | MetaCommand::SequenceOrTrackName =
                        meta.command
                    {
                        name = Some(String::from_utf8_lossy(&meta.data).into_owned());
                    }
                }
            }
            Event::Midi(message) => {
                let data = &message.data;
                if data.is_empty() {
                    continue;
                }
                let status = data[0] & 0xF0;
                let message_channel = data[0] & 0x0F;

                match status {
                    PROGRAM_CHANGE if data.len() >= 2 => instrument = data[1],
                    NOTE_ON if data.len() >= 3 && data[2] > 0 => {
                        channel.get_or_insert(message_channel);
                        open.push((data[1], message_channel, tick, data[2]));
                    }
                    NOTE_ON | NOTE_OFF if data.len() >= 2 => {
                        let struck = open
                            .iter()
                            .position(|&(key, ch, _, _)| key == data[1] && ch == message_channel);
                        if let Some(position) = struck {
                            let (key, ch, start, velocity) = open.remove(position);
                            timeline.push((
                                start as f64 / ticks_per_bar,
                                Note {
                                    degree: i32::from(key),
                                    duration: (tick - start) as f64 / ticks_per_bar,
                                    volume: velocity,
                                    channel: ch,
                                },
                            ));
                        }
                    }
                    _ => (),
                }
            }
        }
    }

    if timeline.is_empty() {
        return None;
    }

    timeline.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    let end = timeline
        .iter()
        .map(|(onset, note)| onset + note.duration)
        .fold(0.0, f64::max);
    let chord = chord::from_timeline(timeline, end.max(EPSILON));

    let name = name.unwrap_or_else(|| format!("track {}", index));
    Some(Track::new(&name, chord, instrument, channel.unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::Chord;
    use crate::test_helpers::{assert_close, chord, names};

    fn arrangement() -> Arrangement {
        let mut arrangement = Arrangement::new(90);
        let melody = chord(&["C5", "E5", "G5", "C6"], &[0.25, 0.25, 0.25, 0.25]);
        let mut bass = chord(&["C2", "G2"], &[0.5, 0.5]);
        bass.set_volume(70);

        arrangement.add_track(0, Track::new("melody", melody, 25, 0).with_volume(80));
        arrangement.add_track(1, Track::new("bass", bass, 38, 2));
        arrangement
    }

    #[test]
    fn writes_a_standard_midi_file() {
        let midi = generate_midi(&arrangement(), &MidiGenerationOptions::default()).unwrap();
        assert_eq!(&midi[0..4], b"MThd");
    }

    #[test]
    fn notes_survive_a_round_trip() {
        let midi = generate_midi(&arrangement(), &MidiGenerationOptions::default()).unwrap();
        let decoded = read_midi(&midi).unwrap();

        assert_eq!(decoded.bpm, 90);
        let tracks: Vec<&Track> = decoded.tracks().map(|(_, track)| track).collect();
        assert_eq!(tracks.len(), 2);

        assert_eq!(tracks[0].name, "melody");
        assert_eq!(tracks[0].instrument, 25);
        assert_eq!(names(&tracks[0].chord), vec!["C5", "E5", "G5", "C6"]);
        assert_close(tracks[0].chord.notes[1].duration, 0.25);

        assert_eq!(tracks[1].channel, 2);
        assert_eq!(tracks[1].chord.notes[0].volume, 70);
        assert_close(tracks[1].chord.start_time, 1.0);
        assert_close(tracks[1].chord.bars(), 2.0);
    }

    #[test]
    fn out_of_range_notes_are_rejected() {
        let mut arrangement = Arrangement::default();
        let high = Chord::single(Note::new(132), 1.0);
        arrangement.add_track(0, Track::new("high", high, 0, 0));
        assert_eq!(
            generate_midi(&arrangement, &MidiGenerationOptions::default()),
            Err(EngineError::PitchOutOfRange { degree: 132 })
        );
    }

    #[test]
    fn garbage_is_a_codec_error() {
        let error = read_midi(b"not midi").unwrap_err();
        assert_eq!(error.kind(), crate::error::ErrorKind::Codec);
    }
}
