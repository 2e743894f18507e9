/// A chord quality: semitone offsets from the root, plus the spellings
/// accepted for it. `name` is the spelling used when naming detected chords.
#[derive(Debug)]
pub struct Quality {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub intervals: &'static [i32],
}

pub const QUALITIES: &[Quality] = &[
    Quality {
        name: "maj",
        aliases: &["", "M", "major"],
        intervals: &[0, 4, 7],
    },
    Quality {
        name: "m",
        aliases: &["min", "minor", "-"],
        intervals: &[0, 3, 7],
    },
    Quality {
        name: "5",
        aliases: &["power"],
        intervals: &[0, 7],
    },
    Quality {
        name: "dim",
        aliases: &["o"],
        intervals: &[0, 3, 6],
    },
    Quality {
        name: "aug",
        aliases: &["+"],
        intervals: &[0, 4, 8],
    },
    Quality {
        name: "sus2",
        aliases: &[],
        intervals: &[0, 2, 7],
    },
    Quality {
        name: "sus4",
        aliases: &["sus"],
        intervals: &[0, 5, 7],
    },
    Quality {
        name: "6",
        aliases: &["M6", "maj6"],
        intervals: &[0, 4, 7, 9],
    },
    Quality {
        name: "m6",
        aliases: &["min6"],
        intervals: &[0, 3, 7, 9],
    },
    Quality {
        name: "7",
        aliases: &["dom7"],
        intervals: &[0, 4, 7, 10],
    },
    Quality {
        name: "maj7",
        aliases: &["M7", "major7"],
        intervals: &[0, 4, 7, 11],
    },
    Quality {
        name: "m7",
        aliases: &["min7", "minor7"],
        intervals: &[0, 3, 7, 10],
    },
    Quality {
        name: "mM7",
        aliases: &["m(maj7)", "minmaj7"],
        intervals: &[0, 3, 7, 11],
    },
    Quality {
        name: "dim7",
        aliases: &["o7"],
        intervals: &[0, 3, 6, 9],
    },
    Quality {
        name: "m7b5",
        aliases: &["half-dim7"],
        intervals: &[0, 3, 6, 10],
    },
    Quality {
        name: "aug7",
        aliases: &["7#5", "+7"],
        intervals: &[0, 4, 8, 10],
    },
    Quality {
        name: "7sus4",
        aliases: &["7sus"],
        intervals: &[0, 5, 7, 10],
    },
    Quality {
        name: "add9",
        aliases: &["add2"],
        intervals: &[0, 4, 7, 14],
    },
    Quality {
        name: "9",
        aliases: &["dom9"],
        intervals: &[0, 4, 7, 10, 14],
    },
    Quality {
        name: "maj9",
        aliases: &["M9"],
        intervals: &[0, 4, 7, 11, 14],
    },
    Quality {
        name: "m9",
        aliases: &["min9"],
        intervals: &[0, 3, 7, 10, 14],
    },
];

pub fn lookup(spelling: &str) -> Option<&'static Quality> {
    QUALITIES
        .iter()
        .find(|quality| quality.name == spelling || quality.aliases.contains(&spelling))
}

impl Quality {
    /// Sorted pitch classes of this quality built on `root`.
    pub fn pitch_classes(&self, root: u8) -> Vec<u8> {
        let mut classes: Vec<u8> = self
            .intervals
            .iter()
            .map(|interval| ((i32::from(root) + interval).rem_euclid(12)) as u8)
            .collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }
}
