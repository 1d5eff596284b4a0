//! Solfège lyrics for the normalized melody.
//!
//! Letter name only; accidentals do not change the syllable. Movable-do
//! and fixed-do coincide here because the melody is already in C.

use score_import::{Event, EventKind, EventSequence, NoteName};

pub fn syllable(letter: NoteName) -> &'static str {
    match letter {
        NoteName::C => "do",
        NoteName::D => "re",
        NoteName::E => "mi",
        NoteName::F => "fa",
        NoteName::G => "sol",
        NoteName::A => "la",
        NoteName::B => "si",
    }
}

/// Attach a syllable lyric to every note; rests are untouched.
pub fn annotate(melody: &EventSequence) -> EventSequence {
    let events = melody
        .events()
        .iter()
        .map(|event| match &event.kind {
            EventKind::Note { pitch, .. } => Event {
                onset: event.onset,
                duration: event.duration,
                kind: EventKind::Note {
                    pitch: *pitch,
                    lyric: Some(syllable(NoteName::of_pitch(*pitch)).to_string()),
                },
            },
            EventKind::Rest => event.clone(),
        })
        .collect();

    EventSequence::new(events, melody.time_signature)
}
