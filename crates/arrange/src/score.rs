//! The assembled two-part score.

use serde::{Deserialize, Serialize};

use score_import::EventSequence;

use crate::key::Key;

/// Every exported score is marked at this tempo.
pub const OUTPUT_TEMPO_BPM: u32 = 90;

/// Chord vocabulary of the accompaniment heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordLabel {
    C,
    F,
    G,
    Am,
}

impl ChordLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ChordLabel::C => "C",
            ChordLabel::F => "F",
            ChordLabel::G => "G",
            ChordLabel::Am => "Am",
        }
    }

    /// Fixed voicing of the label, bass-clef register.
    pub fn triad(self) -> [u8; 3] {
        match self {
            ChordLabel::C => [60, 64, 67],
            ChordLabel::F => [53, 57, 60],
            ChordLabel::G => [55, 59, 62],
            ChordLabel::Am => [57, 60, 64],
        }
    }
}

impl std::fmt::Display for ChordLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One chord chosen for one measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureChord {
    pub measure: usize,
    pub label: ChordLabel,
}

/// Final pipeline output: the normalized melody plus the optional
/// accompaniment line derived from the per-measure chords.
#[derive(Debug, Clone)]
pub struct Score {
    pub melody: EventSequence,
    pub accompaniment: Option<EventSequence>,
    pub chords: Vec<MeasureChord>,
    pub tempo_bpm: u32,
    /// What key detection saw before transposition, when it saw anything.
    pub detected_key: Option<Key>,
}

impl Score {
    pub fn measure_count(&self) -> usize {
        let bar = self.melody.time_signature.bar_quarters();
        let span = self.melody.span_quarters();
        if span <= 0.0 {
            1
        } else {
            (span / bar).ceil() as usize
        }
    }
}
