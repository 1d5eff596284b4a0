//! Key detection and normalization to C.

use serde::{Deserialize, Serialize};

use score_import::{Event, EventKind, EventSequence};

use crate::simplify::clamp_pitch;

/// Krumhansl-Kessler major key profile (duration-weighted perception studies).
const MAJOR_PROFILE: [f64; 12] = [6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88];

/// Krumhansl-Kessler minor key profile.
const MINOR_PROFILE: [f64; 12] = [6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17];

const NOTE_NAMES_SHARP: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
const NOTE_NAMES_FLAT: [&str; 12] = ["C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B"];

/// Pitch classes conventionally spelled with flats.
const FLAT_ROOTS: [u8; 6] = [1, 3, 5, 6, 8, 10]; // Db, Eb, F, Gb, Ab, Bb

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub tonic_pitch_class: u8,
    pub mode: KeyMode,
    pub confidence: f64,
}

impl Key {
    pub fn name(&self) -> String {
        let root = if FLAT_ROOTS.contains(&self.tonic_pitch_class) {
            NOTE_NAMES_FLAT[self.tonic_pitch_class as usize]
        } else {
            NOTE_NAMES_SHARP[self.tonic_pitch_class as usize]
        };
        match self.mode {
            KeyMode::Major => format!("{root} major"),
            KeyMode::Minor => format!("{root} minor"),
        }
    }
}

/// Detect the key of a melody using the Krumhansl-Schmuckler algorithm.
///
/// Builds a duration-weighted pitch-class histogram and correlates it
/// against all 24 major/minor key profiles. The best Pearson correlation
/// determines the detected key. Returns `None` when there is nothing to
/// correlate against.
pub fn detect_key(sequence: &EventSequence) -> Option<Key> {
    let mut histogram = [0.0_f64; 12];
    for event in sequence.notes() {
        if let Some(pitch) = event.pitch() {
            histogram[(pitch % 12) as usize] += event.duration.max(f64::MIN_POSITIVE);
        }
    }

    let total: f64 = histogram.iter().sum();
    if total == 0.0 {
        return None;
    }

    for h in &mut histogram {
        *h /= total;
    }

    // Correlate against all 24 key profiles (12 roots x 2 modes)
    let mut best_root: u8 = 0;
    let mut best_mode = KeyMode::Major;
    let mut best_corr = -1.0_f64;

    for root in 0..12u8 {
        // Rotate histogram so root = index 0
        let mut rotated = [0.0; 12];
        for i in 0..12 {
            rotated[i] = histogram[(i + root as usize) % 12];
        }

        let major_corr = pearson(&rotated, &MAJOR_PROFILE);
        if major_corr > best_corr {
            best_corr = major_corr;
            best_root = root;
            best_mode = KeyMode::Major;
        }

        let minor_corr = pearson(&rotated, &MINOR_PROFILE);
        if minor_corr > best_corr {
            best_corr = minor_corr;
            best_root = root;
            best_mode = KeyMode::Minor;
        }
    }

    Some(Key {
        tonic_pitch_class: best_root,
        mode: best_mode,
        confidence: (best_corr * 10000.0).round() / 10000.0,
    })
}

/// Pearson correlation coefficient between two 12-element arrays.
fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let x_mean: f64 = x.iter().sum::<f64>() / 12.0;
    let y_mean: f64 = y.iter().sum::<f64>() / 12.0;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;

    for i in 0..12 {
        let xd = x[i] - x_mean;
        let yd = y[i] - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    num / denom
}

/// Transpose a melody so its detected tonic lands on C.
///
/// The smaller of the up/down intervals is chosen, then pitches are
/// re-clamped into the singing range since a downward shift can push a
/// low note out. Detection failure leaves the input untouched; key
/// normalization is best-effort, not safety-critical.
pub fn normalize_to_c(sequence: &EventSequence) -> (EventSequence, Option<Key>) {
    let detected = match detect_key(sequence) {
        Some(key) => key,
        None => {
            tracing::debug!("key detection found no notes, leaving melody as is");
            return (sequence.clone(), None);
        }
    };

    let up = (12 - detected.tonic_pitch_class as i16) % 12;
    let shift = if up > 6 { up - 12 } else { up };
    tracing::debug!(key = %detected.name(), shift, "normalizing to C");

    if shift == 0 {
        return (sequence.clone(), Some(detected));
    }

    let events = sequence
        .events()
        .iter()
        .map(|event| match &event.kind {
            EventKind::Note { pitch, lyric } => Event {
                onset: event.onset,
                duration: event.duration,
                kind: EventKind::Note {
                    pitch: clamp_pitch((*pitch as i16 + shift).clamp(0, 127) as u8),
                    lyric: lyric.clone(),
                },
            },
            EventKind::Rest => event.clone(),
        })
        .collect();

    (
        EventSequence::new(events, sequence.time_signature),
        Some(detected),
    )
}
