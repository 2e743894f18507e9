use regex::Regex;

use crate::error::EngineError;
use crate::notes::{self, Note};

/// Suffix marking a chord name that is really a single note.
pub const NOTE_MARKER: &str = "(note)";

lazy_static! {
    static ref SHORT_NAME: Regex = Regex::new(r"^([A-G][#b]?)([^/]*)(?:/(.+))?$")
        .expect("Failed to compile detected name regex");
}

/// A detector description reduced to something a chord can be built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub root: Option<String>,
    pub quality: String,
    pub bass: Option<String>,
    pub is_slash_ambiguous: bool,
    /// Every bracketed alternative that was considered, in order.
    pub candidates: Vec<String>,
    /// Set when the notes are better described as a single note.
    pub literal: Option<Note>,
}

impl Detection {
    /// Reads a description produced by a [`MusicTheory`](super::MusicTheory)
    /// detector.
    ///
    /// Ambiguous `[A]/[B]` descriptions resolve to the shortest candidate
    /// that is not itself a note name. When no candidate qualifies, or the
    /// description is a `note …`, the result is a literal note; `fallback`
    /// supplies that note if the description does not name one.
    ///
    /// A trailing qualifier such as `C with major third` becomes `CM`.
    pub fn parse(description: &str, fallback: &Note) -> Result<Self, EngineError> {
        let undetectable = || EngineError::Undetectable {
            description: description.to_owned(),
        };

        let text = description.trim();
        if text.is_empty() {
            return Err(undetectable());
        }

        let is_slash_ambiguous = text.contains('/') && text.contains('[');
        let mut candidates = Vec::new();

        let resolved = if is_slash_ambiguous {
            candidates = text
                .split('/')
                .filter_map(|segment| {
                    segment
                        .trim()
                        .trim_start_matches('[')
                        .trim_end_matches(']')
                        .split_whitespace()
                        .next()
                })
                .map(str::to_owned)
                .collect();

            let shortest = candidates
                .iter()
                .filter(|candidate| {
                    !candidate.to_lowercase().starts_with("note") && !notes::is_note_name(candidate)
                })
                .min_by_key(|candidate| candidate.len());

            match shortest {
                Some(candidate) => candidate.clone(),
                None => {
                    return Ok(Detection::literal(*fallback, true, candidates));
                }
            }
        } else {
            text.to_owned()
        };

        let words: Vec<&str> = resolved.split_whitespace().collect();
        let first = words.first().copied().ok_or_else(undetectable)?;

        if first.eq_ignore_ascii_case("note") {
            let note = words
                .get(1)
                .and_then(|name| Note::parse(name, fallback.octave()).ok())
                .unwrap_or(*fallback);
            return Ok(Detection::literal(note, is_slash_ambiguous, candidates));
        }

        let mut short = first.to_owned();
        if words.len() >= 2 {
            let qualifier = words[words.len() - 2];
            if qualifier.contains("major") {
                short.push('M');
            } else if qualifier.contains("minor") {
                short.push('m');
            }
        }

        let captures = SHORT_NAME.captures(&short).ok_or_else(undetectable)?;
        Ok(Detection {
            root: Some(captures[1].to_owned()),
            quality: captures[2].to_owned(),
            bass: captures.get(3).map(|bass| bass.as_str().to_owned()),
            is_slash_ambiguous,
            candidates,
            literal: None,
        })
    }

    fn literal(note: Note, is_slash_ambiguous: bool, candidates: Vec<String>) -> Self {
        Detection {
            root: Some(note.name().to_owned()),
            quality: String::new(),
            bass: None,
            is_slash_ambiguous,
            candidates,
            literal: Some(note),
        }
    }

    /// The name stored in a chord record: a buildable chord name, or the
    /// pitch class followed by [`NOTE_MARKER`].
    pub fn name(&self) -> String {
        if let Some(note) = self.literal {
            return format!("{}{}", note.name(), NOTE_MARKER);
        }

        let mut name = format!("{}{}", self.root.as_deref().unwrap_or(""), self.quality);
        if let Some(bass) = &self.bass {
            name.push('/');
            name.push_str(bass);
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::note;

    fn parse(description: &str) -> Detection {
        Detection::parse(description, &note("E4")).unwrap()
    }

    #[test]
    fn plain_names_pass_through() {
        let detection = parse("Cmaj7");
        assert_eq!(detection.root.as_deref(), Some("C"));
        assert_eq!(detection.quality, "maj7");
        assert_eq!(detection.name(), "Cmaj7");
        assert!(!detection.is_slash_ambiguous);
    }

    #[test]
    fn inversions_keep_their_bass() {
        let detection = parse("Cmaj/E");
        assert_eq!(detection.bass.as_deref(), Some("E"));
        assert_eq!(detection.name(), "Cmaj/E");
    }

    #[test]
    fn ambiguity_picks_the_shortest_candidate() {
        let detection = parse("[Am7]/[C6]");
        assert!(detection.is_slash_ambiguous);
        assert_eq!(detection.candidates, vec!["Am7", "C6"]);
        assert_eq!(detection.name(), "C6");
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        assert_eq!(parse("[C6]/[Am7]/[Em]").name(), "C6");
        assert_eq!(parse("[Em]/[C6]").name(), "Em");
    }

    #[test]
    fn note_candidates_are_skipped() {
        assert_eq!(parse("[note C4]/[G]/[Am]").name(), "G");
        assert_eq!(parse("[C]/[Dsus2 sort]").name(), "Dsus2");
    }

    #[test]
    fn no_candidate_falls_back_to_the_literal_note() {
        let detection = parse("[note C4]/[D]");
        assert_eq!(detection.literal, Some(note("E4")));
        assert_eq!(detection.name(), "E(note)");
    }

    #[test]
    fn single_notes_become_literals() {
        let detection = parse("note G3");
        assert_eq!(detection.literal, Some(note("G3")));
        assert_eq!(detection.name(), "G(note)");
    }

    #[test]
    fn qualifiers_add_a_suffix() {
        assert_eq!(parse("C with major third").name(), "CM");
        assert_eq!(parse("D with minor third").name(), "Dm");
        assert_eq!(parse("C with perfect fourth").name(), "C");
    }

    #[test]
    fn empty_descriptions_fail() {
        assert!(Detection::parse("  ", &note("C4")).is_err());
        assert!(Detection::parse("???", &note("C4")).is_err());
    }
}
