//! ABC notation writer, the lightweight rendering path.
//!
//! Melody only: chord labels are written as chord symbols over each
//! measure and solfège comes out on a `w:` line, which is all the simple
//! web renderers need.

use score_import::{EventKind, NoteName};

use crate::score::Score;

use super::{split_measures, Slice};

/// Serialize the melody as an ABC tune with chord symbols and lyrics.
pub fn export_abc(score: &Score) -> String {
    let ts = score.melody.time_signature;
    let mut abc = String::new();
    abc.push_str("X:1\n");
    abc.push_str("T:Melody in C\n");
    abc.push_str(&format!("M:{}/{}\n", ts.numerator, ts.denominator));
    abc.push_str("L:1/8\n");
    abc.push_str(&format!("Q:1/4={}\n", score.tempo_bpm));
    abc.push_str("K:C\n");

    let measures = split_measures(&score.melody, score.chords.len());
    let mut body = String::new();
    let mut lyrics = String::new();

    for (index, slices) in measures.iter().enumerate() {
        if let Some(chord) = score.chords.iter().find(|c| c.measure == index) {
            body.push_str(&format!("\"{}\"", chord.label));
        }
        for slice in slices {
            body.push_str(&write_slice(slice));
            body.push(' ');
            if let EventKind::Note { lyric, .. } = &slice.kind {
                if !slice.tie_stop {
                    lyrics.push_str(lyric.as_deref().unwrap_or("*"));
                    lyrics.push(' ');
                }
            }
        }
        if slices.is_empty() {
            // Whole-measure rest keeps the bars aligned
            body.push_str(&format!("z{} ", units(ts.bar_quarters())));
        }
        body.push_str("|");
        if index + 1 < measures.len() {
            body.push(' ');
        }
    }

    abc.push_str(body.trim_end());
    abc.push('\n');
    if !lyrics.trim_end().is_empty() {
        abc.push_str("w: ");
        abc.push_str(lyrics.trim_end());
        abc.push('\n');
    }
    abc
}

fn write_slice(slice: &Slice) -> String {
    match &slice.kind {
        EventKind::Rest => format!("z{}", units(slice.duration)),
        EventKind::Note { pitch, .. } => {
            let mut token = String::new();
            let (letter, sharp) = NoteName::from_semitone((*pitch % 12) as i8);
            if sharp {
                token.push('^');
            }

            // Octave 4 (MIDI 60-71) is lowercase; below is uppercase with
            // commas, above gets apostrophes
            let octave = (*pitch / 12) as i16 - 1;
            if octave >= 4 {
                token.push_str(&letter.as_str().to_ascii_lowercase());
                for _ in 4..octave {
                    token.push('\'');
                }
            } else {
                token.push_str(letter.as_str());
                for _ in octave..3 {
                    token.push(',');
                }
            }

            token.push_str(&units(slice.duration));
            if slice.tie_start {
                token.push('-');
            }
            token
        }
    }
}

/// Duration in eighth-note units; every quantized value is whole.
fn units(quarters: f64) -> String {
    let count = (quarters * 2.0).round() as u32;
    if count == 1 {
        String::new()
    } else {
        count.to_string()
    }
}
