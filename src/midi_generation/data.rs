#[derive(Debug)]
pub struct MidiGenerationOptions {
    pub ticks_per_beat: i16,
}

impl Default for MidiGenerationOptions {
    fn default() -> Self {
        MidiGenerationOptions {
            ticks_per_beat: 480,
        }
    }
}

/// A note-on or note-off at an absolute tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct NoteEvent {
    pub tick: u64,
    pub on: bool,
    pub key: u8,
    pub velocity: u8,
    pub channel: u8,
}

impl NoteEvent {
    /// Offs sort before ons at the same tick, so a repeated key is released
    /// before it is struck again.
    pub fn sort_key(&self) -> (u64, bool) {
        (self.tick, self.on)
    }
}
