//! Per-measure chord estimation and block-chord accompaniment.

use score_import::{Event, EventSequence, NoteName, TimeSignature};

use crate::score::{ChordLabel, MeasureChord};

/// Choose one chord per measure with the fixed, ordered heuristic.
///
/// Rules fire in order against the letter names sounding in the measure:
/// any G or B picks G; otherwise two or more of F and A combined pick F;
/// otherwise two or more of A and C combined pick Am; otherwise C.
/// Empty measures get C.
pub fn estimate_chords(melody: &EventSequence) -> Vec<MeasureChord> {
    let bar = melody.time_signature.bar_quarters();
    let span = melody.span_quarters();
    let measure_count = if span <= 0.0 {
        1
    } else {
        (span / bar).ceil() as usize
    };

    (0..measure_count)
        .map(|measure| {
            let start = measure as f64 * bar;
            let end = start + bar;
            let letters: Vec<NoteName> = melody
                .notes()
                .filter(|e| e.onset >= start && e.onset < end)
                .filter_map(|e| e.pitch().map(NoteName::of_pitch))
                .collect();

            MeasureChord {
                measure,
                label: choose(&letters),
            }
        })
        .collect()
}

fn choose(letters: &[NoteName]) -> ChordLabel {
    let count = |name: NoteName| letters.iter().filter(|&&l| l == name).count();

    if letters
        .iter()
        .any(|&l| l == NoteName::G || l == NoteName::B)
    {
        ChordLabel::G
    } else if count(NoteName::F) + count(NoteName::A) >= 2 {
        ChordLabel::F
    } else if count(NoteName::A) + count(NoteName::C) >= 2 {
        ChordLabel::Am
    } else {
        ChordLabel::C
    }
}

/// Half-bar block chord length, matching a 4/4 bar split in two.
const BLOCK_QUARTERS: f64 = 2.0;

/// Render the chosen chords as a bass-clef line of paired block chords.
///
/// Each measure holds two identical triads of two quarters each. Triad
/// members share an onset on purpose; this line never goes through
/// top-line reduction.
pub fn render_accompaniment(
    chords: &[MeasureChord],
    time_signature: TimeSignature,
) -> EventSequence {
    let bar = time_signature.bar_quarters();
    let mut events = Vec::with_capacity(chords.len() * 6);

    for chord in chords {
        let start = chord.measure as f64 * bar;
        for half in 0..2 {
            let onset = start + half as f64 * BLOCK_QUARTERS;
            for pitch in chord.label.triad() {
                events.push(Event::note(onset, BLOCK_QUARTERS, pitch));
            }
        }
    }

    EventSequence::new(events, time_signature)
}
