//! ABC notation importer.
//!
//! A generous line-based header parser followed by a winnow body parser,
//! in the spirit of the ABC standard: unknown fields and decorations are
//! skipped rather than refused, and problems are collected as feedback.

mod note;

use std::collections::HashMap;

use winnow::prelude::*;

use crate::event::{Event, EventSequence, NoteName, TimeSignature};
use crate::{Error, Result};
use note::{parse_chord, parse_chord_symbol, parse_note, parse_rest, AbcNote, Frac};

/// Parsed tune header. Only the fields the pipeline consumes are kept.
#[derive(Debug, Clone, PartialEq)]
struct Header {
    meter: TimeSignature,
    /// Unit note length as a fraction of a whole note (L: field).
    unit: Frac,
    key_root: NoteName,
    key_accidental: i8,
    key_minor: bool,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            meter: TimeSignature::default(),
            unit: Frac::new(1, 8),
            key_root: NoteName::C,
            key_accidental: 0,
            key_minor: false,
        }
    }
}

/// Parse ABC text into a raw event sequence.
///
/// Header fields X/T/C/R and friends are tolerated and ignored; M, L, and K
/// drive timing and pitch resolution. Tied same-pitch notes are merged into
/// one event. Chords emit all members at the same onset so top-line
/// reduction can collapse them later.
pub fn import_abc(text: &str) -> Result<EventSequence> {
    let (body, header) = parse_header(text);
    let events = parse_body(body, &header)?;
    Ok(EventSequence::new(events, header.meter))
}

/// Walk header lines up to and including the K: field.
fn parse_header(input: &str) -> (&str, Header) {
    let mut header = Header::default();
    let mut remaining = input;

    for line in input.lines() {
        let trimmed = line.trim();
        let consumed = line.len();

        if trimmed.is_empty() || trimmed.starts_with('%') {
            remaining = advance(remaining, consumed);
            continue;
        }

        if trimmed.len() >= 2 && trimmed.as_bytes()[1] == b':' {
            let field = trimmed.as_bytes()[0] as char;
            let value = trimmed[2..].trim();
            match field {
                'M' => header.meter = parse_meter(value),
                'L' => header.unit = parse_unit_length(value),
                'K' => {
                    parse_key_field(value, &mut header);
                    remaining = advance(remaining, consumed);
                    break;
                }
                // X, T, Q, C, R, S, N, ... carry no pipeline-relevant data
                _ => {}
            }
            remaining = advance(remaining, consumed);
        } else {
            // Body started before K:, assume C major
            break;
        }
    }

    (remaining, header)
}

/// Step past one header line and its line terminator.
fn advance(rem: &str, consumed: usize) -> &str {
    let rem = &rem[consumed.min(rem.len())..];
    rem.strip_prefix("\r\n")
        .or_else(|| rem.strip_prefix('\n'))
        .unwrap_or(rem)
}

/// Meter field value: `4/4`, `C` (common), `C|` (cut).
fn parse_meter(value: &str) -> TimeSignature {
    match value {
        "C" => TimeSignature::new(4, 4),
        "C|" => TimeSignature::new(2, 2),
        _ => parse_fraction(value)
            .map(|(n, d)| TimeSignature::new(n, d))
            .unwrap_or_default(),
    }
}

fn parse_unit_length(value: &str) -> Frac {
    parse_fraction(value)
        .map(|(n, d)| Frac::new(n as u16, d as u16))
        .unwrap_or(Frac::new(1, 8))
}

fn parse_fraction(s: &str) -> Option<(u8, u8)> {
    let (num, den) = s.split_once('/')?;
    Some((num.trim().parse().ok()?, den.trim().parse().ok()?))
}

/// Key field value: root letter, optional `#`/`b`, optional mode suffix
/// (`m`, `min`, `minor` recognized; other modes fall back to major).
fn parse_key_field(value: &str, header: &mut Header) {
    let mut rest = value.trim();

    if let Some(first) = rest.chars().next() {
        if let Some(root) = match first.to_ascii_uppercase() {
            'C' => Some(NoteName::C),
            'D' => Some(NoteName::D),
            'E' => Some(NoteName::E),
            'F' => Some(NoteName::F),
            'G' => Some(NoteName::G),
            'A' => Some(NoteName::A),
            'B' => Some(NoteName::B),
            _ => None,
        } {
            header.key_root = root;
            rest = &rest[1..];
        }
    }

    if let Some(stripped) = rest.strip_prefix('#') {
        header.key_accidental = 1;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('b') {
        header.key_accidental = -1;
        rest = stripped;
    }

    let mode = rest.trim().to_lowercase();
    header.key_minor = matches!(mode.as_str(), "m" | "min" | "minor" | "aeo" | "aeolian");
}

/// Per-letter semitone adjustments implied by the key signature.
///
/// Derived from the circle of fifths: 7 is its own inverse mod 12, so the
/// fifths count for a major tonic pitch class pc is (pc * 7) mod 12 mapped
/// into -5..=6. Minor keys use their relative major.
fn key_signature(header: &Header) -> HashMap<NoteName, i8> {
    const SHARP_ORDER: [NoteName; 7] = [
        NoteName::F,
        NoteName::C,
        NoteName::G,
        NoteName::D,
        NoteName::A,
        NoteName::E,
        NoteName::B,
    ];
    const FLAT_ORDER: [NoteName; 7] = [
        NoteName::B,
        NoteName::E,
        NoteName::A,
        NoteName::D,
        NoteName::G,
        NoteName::C,
        NoteName::F,
    ];

    let mut pc = (header.key_root.to_semitone() + header.key_accidental).rem_euclid(12);
    if header.key_minor {
        pc = (pc + 3).rem_euclid(12);
    }

    let mut fifths = (pc * 7).rem_euclid(12);
    if fifths > 6 {
        fifths -= 12;
    }

    let mut map = HashMap::new();
    if fifths > 0 {
        for letter in &SHARP_ORDER[..fifths as usize] {
            map.insert(*letter, 1);
        }
    } else if fifths < 0 {
        for letter in &FLAT_ORDER[..(-fifths) as usize] {
            map.insert(*letter, -1);
        }
    }
    map
}

/// MIDI pitch of a body note given the key signature and any accidentals
/// already sounded this measure (ABC accidentals last until the bar line).
fn resolve_pitch(
    note: &AbcNote,
    signature: &HashMap<NoteName, i8>,
    measure: &mut HashMap<(NoteName, i8), i8>,
) -> u8 {
    let adjust = match note.accidental {
        Some(acc) => {
            let offset = acc.semitone_offset();
            measure.insert((note.letter, note.octave), offset);
            offset
        }
        None => measure
            .get(&(note.letter, note.octave))
            .copied()
            .unwrap_or_else(|| signature.get(&note.letter).copied().unwrap_or(0)),
    };

    // ABC octave 1 (lowercase) is the middle-C octave, MIDI 60-71
    let base = note.letter.to_semitone() as i16 + (note.octave as i16 + 4) * 12;
    (base + adjust as i16).clamp(0, 127) as u8
}

fn parse_body(body: &str, header: &Header) -> Result<Vec<Event>> {
    let signature = key_signature(header);
    let unit_quarters = 4.0 * header.unit.as_f64();

    // Field lines inside the body (w: lyrics, continued headers) carry no
    // melodic content
    let body = body
        .lines()
        .filter(|line| {
            let t = line.trim_start();
            !(t.len() >= 2 && t.as_bytes()[0].is_ascii_alphabetic() && t.as_bytes()[1] == b':')
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut events: Vec<Event> = Vec::new();
    let mut measure_accidentals: HashMap<(NoteName, i8), i8> = HashMap::new();
    let mut onset: f64 = 0.0;
    // Index of the last melodic note if it carried a tie
    let mut open_tie: Option<usize> = None;

    let mut input = body.as_str();
    while !input.is_empty() {
        let c = input.chars().next().unwrap_or(' ');

        // Bar lines end the reach of measure accidentals
        if c == '|' || c == ':' || c == ']' {
            input = input.trim_start_matches(['|', ':', ']']);
            // |1, :|2 ending numbers
            input = input.trim_start_matches(|ch: char| ch.is_ascii_digit());
            measure_accidentals.clear();
            continue;
        }

        if c.is_whitespace() || c == '\\' || c == '(' || c == ')' || c == '.' || c == '~' {
            input = &input[c.len_utf8()..];
            continue;
        }

        if c == '%' {
            // Comment runs to end of line
            input = input.find('\n').map(|i| &input[i..]).unwrap_or("");
            continue;
        }

        if c == '"' {
            parse_chord_symbol
                .parse_next(&mut input)
                .map_err(|_| Error::Parse("unterminated chord symbol".into()))?;
            continue;
        }

        if c == '!' {
            // Decoration !trill! etc.
            let after = &input[1..];
            match after.find('!') {
                Some(end) => input = &after[end + 1..],
                None => return Err(Error::Parse("unterminated decoration".into())),
            }
            continue;
        }

        if c == '[' {
            // Volta start [1, [2 and thick barline [|
            if input.len() >= 2 && input.as_bytes()[1].is_ascii_digit() {
                input = input[1..].trim_start_matches(|ch: char| ch.is_ascii_digit());
                continue;
            }
            if input.len() >= 2 && input.as_bytes()[1] == b'|' {
                input = &input[1..];
                continue;
            }
            // Inline field like [M:3/4] is skipped; otherwise a chord
            if input.len() >= 3 && input.as_bytes()[2] == b':' {
                match input.find(']') {
                    Some(end) => input = &input[end + 1..],
                    None => return Err(Error::Parse("unterminated inline field".into())),
                }
                continue;
            }

            let (notes, length) = parse_chord
                .parse_next(&mut input)
                .map_err(|_| Error::Parse("malformed chord".into()))?;
            let duration = unit_quarters * length.as_f64();
            if duration > 0.0 {
                for member in &notes {
                    let pitch = resolve_pitch(member, &signature, &mut measure_accidentals);
                    events.push(Event::note(onset, duration, pitch));
                }
                onset += duration;
            }
            open_tie = None;
            continue;
        }

        if c == 'z' || c == 'x' {
            let rest = parse_rest
                .parse_next(&mut input)
                .map_err(|_| Error::Parse("malformed rest".into()))?;
            let duration = unit_quarters * rest.length.as_f64();
            if duration > 0.0 {
                events.push(Event::rest(onset, duration));
                onset += duration;
            }
            open_tie = None;
            continue;
        }

        match parse_note.parse_next(&mut input) {
            Ok(note) => {
                let pitch = resolve_pitch(&note, &signature, &mut measure_accidentals);
                let duration = unit_quarters * note.length.as_f64();
                if duration <= 0.0 {
                    continue;
                }

                // Merge a tied continuation of the same pitch
                let merged = match open_tie {
                    Some(idx) if events[idx].pitch() == Some(pitch) => {
                        events[idx].duration += duration;
                        onset += duration;
                        Some(idx)
                    }
                    _ => None,
                };

                if merged.is_none() {
                    events.push(Event::note(onset, duration, pitch));
                    onset += duration;
                }

                let last = merged.unwrap_or(events.len() - 1);
                open_tie = note.tie.then_some(last);
            }
            Err(_) => {
                return Err(Error::Parse(format!(
                    "unrecognized ABC token at '{}'",
                    input.chars().take(12).collect::<String>()
                )));
            }
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pitches(seq: &EventSequence) -> Vec<u8> {
        seq.events().iter().filter_map(|e| e.pitch()).collect()
    }

    #[test]
    fn minimal_tune() {
        let seq = import_abc("X:1\nT:Test\nK:C\nCDEF|\n").unwrap();
        assert_eq!(pitches(&seq), vec![48, 50, 52, 53]);
        // Default unit length 1/8 → half a quarter each
        assert_eq!(seq.events()[0].duration, 0.5);
        assert_eq!(seq.events()[1].onset, 0.5);
    }

    #[test]
    fn lowercase_is_middle_octave() {
        let seq = import_abc("X:1\nK:C\ncdef|\n").unwrap();
        assert_eq!(pitches(&seq), vec![60, 62, 64, 65]);
    }

    #[test]
    fn meter_and_unit_length_respected() {
        let seq = import_abc("X:1\nM:3/4\nL:1/4\nK:C\nCDE|\n").unwrap();
        assert_eq!(seq.time_signature, TimeSignature::new(3, 4));
        assert_eq!(seq.events()[0].duration, 1.0);
        assert_eq!(seq.events()[2].onset, 2.0);
    }

    #[test]
    fn key_signature_sharpens_notes() {
        // G major: F is sharp
        let seq = import_abc("X:1\nK:G\nFG|\n").unwrap();
        assert_eq!(pitches(&seq), vec![54, 55]); // F#3, G3
    }

    #[test]
    fn minor_key_uses_relative_major_signature() {
        // E minor = G major signature, one sharp (F)
        let seq = import_abc("X:1\nK:Em\nF|\n").unwrap();
        assert_eq!(pitches(&seq), vec![54]);
    }

    #[test]
    fn measure_accidental_persists_to_bar_line() {
        let seq = import_abc("X:1\nK:C\n^FF|F|\n").unwrap();
        // Sharp carries within the measure, resets after |
        assert_eq!(pitches(&seq), vec![54, 54, 53]);
    }

    #[test]
    fn natural_overrides_key_signature() {
        let seq = import_abc("X:1\nK:G\n=F|\n").unwrap();
        assert_eq!(pitches(&seq), vec![53]);
    }

    #[test]
    fn rests_and_chords() {
        let seq = import_abc("X:1\nL:1/4\nK:C\nz[CEG]|\n").unwrap();
        assert_eq!(seq.len(), 4);
        assert!(!seq.events()[0].is_note());
        // Chord members share the onset after the rest
        assert_eq!(seq.events()[1].onset, 1.0);
        assert_eq!(seq.events()[3].onset, 1.0);
    }

    #[test]
    fn tied_notes_merge() {
        let seq = import_abc("X:1\nL:1/4\nK:C\nC2-C2|\n").unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.events()[0].duration, 4.0);
    }

    #[test]
    fn chord_symbols_and_decorations_skipped() {
        let seq = import_abc("X:1\nK:C\n\"G\"!trill!GAB|\n").unwrap();
        assert_eq!(pitches(&seq), vec![55, 57, 59]);
    }

    #[test]
    fn flat_key_signature() {
        // F major: B is flat
        let seq = import_abc("X:1\nK:F\nBc|\n").unwrap();
        assert_eq!(pitches(&seq), vec![58, 60]);
    }

    #[test]
    fn lyric_lines_are_skipped() {
        let seq = import_abc("X:1\nK:C\nCDE|\nw: do re mi\n").unwrap();
        assert_eq!(pitches(&seq), vec![48, 50, 52]);
    }

    #[test]
    fn volta_endings_are_skipped() {
        let seq = import_abc("X:1\nK:C\nC D |[1 E :|[2 G |\n").unwrap();
        assert_eq!(pitches(&seq), vec![48, 50, 52, 55]);
    }

    #[test]
    fn comment_and_blank_header_lines() {
        let seq = import_abc("X:1\n% a remark\n\nT:Test\nK:C\nCD|\n").unwrap();
        assert_eq!(pitches(&seq), vec![48, 50]);
    }

    #[test]
    fn unrecognized_token_is_a_parse_error() {
        let err = import_abc("X:1\nK:C\nC?D|\n").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
