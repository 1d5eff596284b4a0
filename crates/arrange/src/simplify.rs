//! Melody simplification: duration quantization and pitch clamping.
//!
//! Durations snap to a small fixed vocabulary a beginner can read, and
//! pitches fold by octaves into the C4..C5 singing range. The mapping is
//! strictly 1:1; nothing is merged or split, and onsets are re-laid
//! sequentially from the quantized durations.

use score_import::{Event, EventKind, EventSequence};

/// Permitted note lengths, in quarters.
pub const QUANTIZED_DURATIONS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];

/// Inclusive singing range, C4..C5.
pub const PITCH_MIN: u8 = 60;
pub const PITCH_MAX: u8 = 72;

/// Snap a duration to the nearest permitted value; the larger candidate
/// wins at exact midpoints (0.75 goes to 1.0, not 0.5).
pub fn quantize_duration(duration: f64) -> f64 {
    let mut best = QUANTIZED_DURATIONS[0];
    for &candidate in &QUANTIZED_DURATIONS[1..] {
        let diff = (candidate - duration).abs();
        let best_diff = (best - duration).abs();
        if diff < best_diff || (diff == best_diff && candidate > best) {
            best = candidate;
        }
    }
    best
}

/// Fold a pitch into [PITCH_MIN, PITCH_MAX] by whole octaves.
pub fn clamp_pitch(pitch: u8) -> u8 {
    let mut p = pitch as i16;
    while p < PITCH_MIN as i16 {
        p += 12;
    }
    while p > PITCH_MAX as i16 {
        p -= 12;
    }
    p as u8
}

/// Simplify a raw sequence into the beginner-readable form.
pub fn simplify(sequence: &EventSequence) -> EventSequence {
    let mut onset = 0.0;
    let events = sequence
        .events()
        .iter()
        .map(|event| {
            let duration = quantize_duration(event.duration);
            let kind = match &event.kind {
                EventKind::Note { pitch, lyric } => EventKind::Note {
                    pitch: clamp_pitch(*pitch),
                    lyric: lyric.clone(),
                },
                EventKind::Rest => EventKind::Rest,
            };
            let simplified = Event {
                onset,
                duration,
                kind,
            };
            onset += duration;
            simplified
        })
        .collect();

    EventSequence::new(events, sequence.time_signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use score_import::TimeSignature;

    #[test]
    fn quantizes_to_the_nearest_bucket() {
        assert_eq!(quantize_duration(0.4), 0.5);
        assert_eq!(quantize_duration(0.9), 1.0);
        assert_eq!(quantize_duration(1.6), 2.0);
        assert_eq!(quantize_duration(3.3), 4.0);
        assert_eq!(quantize_duration(10.0), 4.0);
        assert_eq!(quantize_duration(0.01), 0.5);
    }

    #[test]
    fn midpoint_tie_prefers_larger() {
        assert_eq!(quantize_duration(0.75), 1.0);
        assert_eq!(quantize_duration(1.5), 2.0);
        assert_eq!(quantize_duration(3.0), 4.0);
    }

    #[test]
    fn clamps_by_whole_octaves() {
        assert_eq!(clamp_pitch(48), 60);
        assert_eq!(clamp_pitch(36), 60);
        assert_eq!(clamp_pitch(84), 72);
        assert_eq!(clamp_pitch(86), 62);
        assert_eq!(clamp_pitch(65), 65);
        assert_eq!(clamp_pitch(60), 60);
        assert_eq!(clamp_pitch(72), 72);
    }

    #[test]
    fn clamp_preserves_pitch_class() {
        for pitch in 0..=127u8 {
            let clamped = clamp_pitch(pitch);
            assert!((PITCH_MIN..=PITCH_MAX).contains(&clamped));
            assert_eq!(clamped % 12, pitch % 12);
        }
    }

    #[test]
    fn mapping_is_one_to_one_with_sequential_onsets() {
        let raw = EventSequence::new(
            vec![
                Event::note(0.0, 0.4, 48),
                Event::rest(0.4, 0.9),
                Event::note(1.3, 1.7, 86),
            ],
            TimeSignature::default(),
        );

        let simplified = simplify(&raw);
        assert_eq!(simplified.len(), 3);

        let events = simplified.events();
        assert_eq!(events[0].onset, 0.0);
        assert_eq!(events[0].duration, 0.5);
        assert_eq!(events[0].pitch(), Some(60));
        assert_eq!(events[1].onset, 0.5);
        assert_eq!(events[1].duration, 1.0);
        assert!(!events[1].is_note());
        assert_eq!(events[2].onset, 1.5);
        assert_eq!(events[2].duration, 2.0);
        assert_eq!(events[2].pitch(), Some(62));
    }

    #[test]
    fn rests_keep_no_pitch() {
        let raw = EventSequence::new(vec![Event::rest(0.0, 0.3)], TimeSignature::default());
        let simplified = simplify(&raw);
        assert_eq!(simplified.events()[0].pitch(), None);
        assert_eq!(simplified.events()[0].duration, 0.5);
    }

    #[test]
    fn time_signature_carries_through() {
        let raw = EventSequence::new(
            vec![Event::note(0.0, 1.0, 60)],
            TimeSignature::new(3, 4),
        );
        assert_eq!(simplify(&raw).time_signature, TimeSignature::new(3, 4));
    }
}
