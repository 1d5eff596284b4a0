use serde::{Deserialize, Serialize};

/// Onset comparison tolerance, in quarter-note units.
///
/// Floating-point onsets that differ by less than this are treated as
/// simultaneous during top-line reduction.
pub const ONSET_EPSILON: f64 = 1e-6;

/// A single melodic event: a pitched note or a rest.
///
/// Times are in abstract quarter-note units from the start of the piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub onset: f64,
    /// Quarter-note length, always > 0.
    pub duration: f64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Note {
        /// MIDI semitone number, middle C (C4) = 60.
        pitch: u8,
        /// Attached lyric syllable, if any.
        lyric: Option<String>,
    },
    Rest,
}

impl Event {
    pub fn note(onset: f64, duration: f64, pitch: u8) -> Self {
        Event {
            onset,
            duration,
            kind: EventKind::Note { pitch, lyric: None },
        }
    }

    pub fn rest(onset: f64, duration: f64) -> Self {
        Event {
            onset,
            duration,
            kind: EventKind::Rest,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, EventKind::Note { .. })
    }

    pub fn pitch(&self) -> Option<u8> {
        match self.kind {
            EventKind::Note { pitch, .. } => Some(pitch),
            EventKind::Rest => None,
        }
    }

    pub fn lyric(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Note { lyric, .. } => lyric.as_deref(),
            EventKind::Rest => None,
        }
    }
}

/// Time signature governing measure lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSignature {
    /// Build a time signature, falling back to 4/4 on a zero numerator or
    /// denominator so measure math stays finite.
    pub fn new(numerator: u8, denominator: u8) -> Self {
        if numerator == 0 || denominator == 0 {
            return TimeSignature::default();
        }
        TimeSignature {
            numerator,
            denominator,
        }
    }

    /// Length of one measure in quarter-note units.
    pub fn bar_quarters(&self) -> f64 {
        if self.numerator == 0 || self.denominator == 0 {
            return TimeSignature::default().bar_quarters();
        }
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

/// An ordered monophonic line of events.
///
/// Onsets are non-decreasing. Each pipeline stage produces a fresh
/// sequence rather than mutating the one it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSequence {
    events: Vec<Event>,
    pub time_signature: TimeSignature,
    /// Tempo the source file declared, if any. Arrangement always renders
    /// at its own fixed tempo; this is kept for reporting.
    #[serde(default)]
    pub source_tempo_bpm: Option<f64>,
}

impl EventSequence {
    /// Build a sequence, sorting events into onset order (ties by pitch
    /// for determinism, rests first).
    pub fn new(mut events: Vec<Event>, time_signature: TimeSignature) -> Self {
        events.sort_by(|a, b| {
            a.onset
                .partial_cmp(&b.onset)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.pitch().cmp(&b.pitch()))
        });
        EventSequence {
            events,
            time_signature,
            source_tempo_bpm: None,
        }
    }

    pub fn empty() -> Self {
        EventSequence {
            events: Vec::new(),
            time_signature: TimeSignature::default(),
            source_tempo_bpm: None,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_note())
    }

    /// End of the last event, in quarter-note units.
    pub fn span_quarters(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.onset + e.duration)
            .fold(0.0, f64::max)
    }
}

/// Natural letter names, used for solfège and the chord heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    /// Semitone offset from C (0-11).
    pub fn to_semitone(self) -> i8 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }

    /// Letter and sharp flag for a pitch class, preferring sharp spelling.
    pub fn from_semitone(semitone: i8) -> (NoteName, bool) {
        match semitone.rem_euclid(12) {
            0 => (NoteName::C, false),
            1 => (NoteName::C, true),
            2 => (NoteName::D, false),
            3 => (NoteName::D, true),
            4 => (NoteName::E, false),
            5 => (NoteName::F, false),
            6 => (NoteName::F, true),
            7 => (NoteName::G, false),
            8 => (NoteName::G, true),
            9 => (NoteName::A, false),
            10 => (NoteName::A, true),
            11 => (NoteName::B, false),
            _ => unreachable!(),
        }
    }

    /// Natural letter of a MIDI pitch under sharp spelling.
    pub fn of_pitch(pitch: u8) -> NoteName {
        NoteName::from_semitone((pitch % 12) as i8).0
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::D => "D",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::G => "G",
            NoteName::A => "A",
            NoteName::B => "B",
        }
    }
}
