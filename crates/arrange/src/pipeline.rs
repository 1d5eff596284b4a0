//! Stage wiring: raw events in, assembled score out.

use score_import::EventSequence;

use crate::chords::{estimate_chords, render_accompaniment};
use crate::key::normalize_to_c;
use crate::score::{Score, OUTPUT_TEMPO_BPM};
use crate::simplify::simplify;
use crate::solfege::annotate;

/// What to include alongside the bare melody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    pub with_accompaniment: bool,
    pub with_solfege: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptions {
            with_accompaniment: true,
            with_solfege: true,
        }
    }
}

/// Run the full arrangement over a raw event sequence.
///
/// Order matters: simplify before normalization, so octave clamping sees
/// the original register; chord estimation and solfège both read the
/// normalized melody.
pub fn assemble(raw: &EventSequence, options: AssembleOptions) -> Score {
    let simplified = simplify(raw);
    let (normalized, detected_key) = normalize_to_c(&simplified);

    let chords = estimate_chords(&normalized);
    let accompaniment = options
        .with_accompaniment
        .then(|| render_accompaniment(&chords, normalized.time_signature));

    let melody = if options.with_solfege {
        annotate(&normalized)
    } else {
        normalized
    };

    tracing::info!(
        notes = melody.notes().count(),
        measures = chords.len(),
        key = detected_key.map(|k| k.name()).as_deref().unwrap_or("unknown"),
        "assembled score"
    );

    Score {
        melody,
        accompaniment,
        chords,
        tempo_bpm: OUTPUT_TEMPO_BPM,
        detected_key,
    }
}
