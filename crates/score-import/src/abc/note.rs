//! Winnow combinators for ABC body elements.

use winnow::combinator::{alt, opt, repeat};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::event::NoteName;

type PResult<T> = winnow::ModalResult<T>;

/// Explicit accidental on a note (`^`, `^^`, `_`, `__`, `=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    DoubleSharp,
    Sharp,
    Natural,
    Flat,
    DoubleFlat,
}

impl Accidental {
    pub fn semitone_offset(self) -> i8 {
        match self {
            Accidental::DoubleSharp => 2,
            Accidental::Sharp => 1,
            Accidental::Natural => 0,
            Accidental::Flat => -1,
            Accidental::DoubleFlat => -2,
        }
    }
}

/// Note length as a ratio of the unit note length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frac {
    pub numerator: u16,
    pub denominator: u16,
}

impl Frac {
    pub fn new(numerator: u16, denominator: u16) -> Self {
        Frac {
            numerator,
            denominator,
        }
    }

    #[cfg(test)]
    pub fn unit() -> Self {
        Frac::new(1, 1)
    }

    pub fn as_f64(self) -> f64 {
        self.numerator as f64 / self.denominator.max(1) as f64
    }
}

/// A note token from the tune body, before key-signature resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AbcNote {
    pub letter: NoteName,
    /// 0 = the C-B octave (MIDI 48-59), 1 = c-b (MIDI 60-71).
    pub octave: i8,
    pub accidental: Option<Accidental>,
    pub length: Frac,
    pub tie: bool,
}

/// A rest token (`z` visible, `x` invisible).
#[derive(Debug, Clone, PartialEq)]
pub struct AbcRest {
    pub length: Frac,
}

/// Uppercase letters are octave 0, lowercase octave 1.
pub fn parse_pitch(input: &mut &str) -> PResult<(NoteName, i8)> {
    let c = one_of([
        'C', 'D', 'E', 'F', 'G', 'A', 'B', 'c', 'd', 'e', 'f', 'g', 'a', 'b',
    ])
    .parse_next(input)?;
    let octave = if c.is_ascii_lowercase() { 1 } else { 0 };
    let letter = match c.to_ascii_uppercase() {
        'C' => NoteName::C,
        'D' => NoteName::D,
        'E' => NoteName::E,
        'F' => NoteName::F,
        'G' => NoteName::G,
        'A' => NoteName::A,
        'B' => NoteName::B,
        _ => unreachable!(),
    };
    Ok((letter, octave))
}

pub fn parse_accidental(input: &mut &str) -> PResult<Accidental> {
    alt((
        "^^".map(|_| Accidental::DoubleSharp),
        "^".map(|_| Accidental::Sharp),
        "__".map(|_| Accidental::DoubleFlat),
        "_".map(|_| Accidental::Flat),
        "=".map(|_| Accidental::Natural),
    ))
    .parse_next(input)
}

/// Octave marks: each `'` raises, each `,` lowers.
pub fn parse_octave_marks(input: &mut &str) -> PResult<i8> {
    let ups: Vec<char> = repeat(0.., '\'').parse_next(input)?;
    let downs: Vec<char> = repeat(0.., ',').parse_next(input)?;
    Ok(ups.len() as i8 - downs.len() as i8)
}

/// Length suffix: `2`, `/2`, `3/2`, `/` (= /2), or empty (= 1/1).
pub fn parse_length(input: &mut &str) -> PResult<Frac> {
    let mult: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let numerator: u16 = if mult.is_empty() {
        1
    } else {
        mult.parse().unwrap_or(1)
    };

    let denominator = match opt('/').parse_next(input)? {
        None => 1,
        Some(_) => {
            let den: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
            if den.is_empty() {
                2
            } else {
                den.parse().unwrap_or(2)
            }
        }
    };

    Ok(Frac::new(numerator, denominator))
}

pub fn parse_note(input: &mut &str) -> PResult<AbcNote> {
    let accidental = opt(parse_accidental).parse_next(input)?;
    let (letter, base_octave) = parse_pitch(input)?;
    let marks = parse_octave_marks(input)?;
    let length = parse_length(input)?;
    let tie = opt('-').parse_next(input)?.is_some();

    Ok(AbcNote {
        letter,
        octave: base_octave + marks,
        accidental,
        length,
        tie,
    })
}

pub fn parse_rest(input: &mut &str) -> PResult<AbcRest> {
    one_of(['z', 'x']).parse_next(input)?;
    let length = parse_length(input)?;
    Ok(AbcRest { length })
}

/// Bracketed chord `[CEG]2`; the trailing length scales every member.
pub fn parse_chord(input: &mut &str) -> PResult<(Vec<AbcNote>, Frac)> {
    '['.parse_next(input)?;

    let mut notes = Vec::new();
    loop {
        *input = input.trim_start_matches(' ');
        match parse_note.parse_next(input) {
            Ok(note) => notes.push(note),
            Err(_) => break,
        }
    }

    ']'.parse_next(input)?;
    let length = parse_length(input)?;
    Ok((notes, length))
}

/// Quoted chord symbol `"Am"`; parsed and discarded by the importer.
pub fn parse_chord_symbol(input: &mut &str) -> PResult<String> {
    '"'.parse_next(input)?;
    let symbol: &str = take_while(0.., |c: char| c != '"').parse_next(input)?;
    '"'.parse_next(input)?;
    Ok(symbol.to_string())
}
