//! MusicXML 3.1 partwise writer.

use score_import::{EventKind, EventSequence, NoteName, ONSET_EPSILON};

use crate::score::Score;

use super::{split_measures, Slice};

/// Ticks per quarter in the emitted document. Every permitted duration
/// is a whole number of halves.
const DIVISIONS: u32 = 2;

pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Serialize the assembled score as a two-part (or melody-only) partwise
/// document.
pub fn export_musicxml(score: &Score) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 3.1 Partwise//EN\" \"http://www.musicxml.org/dtds/partwise.dtd\">\n");
    xml.push_str("<score-partwise version=\"3.1\">\n");
    xml.push_str("  <movement-title>Melody in C</movement-title>\n");

    xml.push_str("  <part-list>\n");
    xml.push_str("    <score-part id=\"P1\">\n");
    xml.push_str("      <part-name>Melody</part-name>\n");
    xml.push_str("    </score-part>\n");
    if score.accompaniment.is_some() {
        xml.push_str("    <score-part id=\"P2\">\n");
        xml.push_str("      <part-name>Accompaniment</part-name>\n");
        xml.push_str("    </score-part>\n");
    }
    xml.push_str("  </part-list>\n");

    let measure_count = score.measure_count();
    write_part(&mut xml, "P1", &score.melody, measure_count, Clef::Treble, Some(score.tempo_bpm));
    if let Some(accompaniment) = &score.accompaniment {
        write_part(&mut xml, "P2", accompaniment, measure_count, Clef::Bass, None);
    }

    xml.push_str("</score-partwise>\n");
    xml
}

#[derive(Clone, Copy)]
enum Clef {
    Treble,
    Bass,
}

fn write_part(
    xml: &mut String,
    id: &str,
    sequence: &EventSequence,
    measure_count: usize,
    clef: Clef,
    tempo_bpm: Option<u32>,
) {
    let bar = sequence.time_signature.bar_quarters();
    let measures = split_measures(sequence, measure_count);

    xml.push_str(&format!("  <part id=\"{id}\">\n"));

    for (index, slices) in measures.iter().enumerate() {
        xml.push_str(&format!("    <measure number=\"{}\">\n", index + 1));

        if index == 0 {
            xml.push_str("      <attributes>\n");
            xml.push_str(&format!("        <divisions>{DIVISIONS}</divisions>\n"));
            xml.push_str("        <key>\n          <fifths>0</fifths>\n          <mode>major</mode>\n        </key>\n");
            xml.push_str(&format!(
                "        <time>\n          <beats>{}</beats>\n          <beat-type>{}</beat-type>\n        </time>\n",
                sequence.time_signature.numerator, sequence.time_signature.denominator
            ));
            match clef {
                Clef::Treble => xml.push_str("        <clef>\n          <sign>G</sign>\n          <line>2</line>\n        </clef>\n"),
                Clef::Bass => xml.push_str("        <clef>\n          <sign>F</sign>\n          <line>4</line>\n        </clef>\n"),
            }
            xml.push_str("      </attributes>\n");

            if let Some(bpm) = tempo_bpm {
                xml.push_str("      <direction placement=\"above\">\n");
                xml.push_str("        <direction-type>\n");
                xml.push_str("          <metronome>\n");
                xml.push_str("            <beat-unit>quarter</beat-unit>\n");
                xml.push_str(&format!("            <per-minute>{bpm}</per-minute>\n"));
                xml.push_str("          </metronome>\n");
                xml.push_str("        </direction-type>\n");
                xml.push_str(&format!("        <sound tempo=\"{bpm}\"/>\n"));
                xml.push_str("      </direction>\n");
            }
        }

        let mut filled = 0.0;
        let mut previous_onset = f64::NEG_INFINITY;
        for slice in slices {
            let chord_member = (slice.onset - previous_onset).abs() < ONSET_EPSILON;
            write_slice(xml, slice, chord_member);
            if !chord_member {
                filled += slice.duration;
            }
            previous_onset = slice.onset;
        }

        // Pad a short final measure with a rest so the bar adds up
        let remainder = bar - filled;
        if remainder > ONSET_EPSILON {
            write_rest(xml, remainder);
        }

        xml.push_str("    </measure>\n");
    }

    xml.push_str("  </part>\n");
}

fn write_slice(xml: &mut String, slice: &Slice, chord_member: bool) {
    match &slice.kind {
        EventKind::Rest => write_rest(xml, slice.duration),
        EventKind::Note { pitch, lyric } => {
            let (letter, sharp) = NoteName::from_semitone((pitch % 12) as i8);
            let octave = (pitch / 12) as i16 - 1;

            xml.push_str("      <note>\n");
            if chord_member {
                xml.push_str("        <chord/>\n");
            }
            xml.push_str("        <pitch>\n");
            xml.push_str(&format!("          <step>{}</step>\n", letter.as_str()));
            if sharp {
                xml.push_str("          <alter>1</alter>\n");
            }
            xml.push_str(&format!("          <octave>{octave}</octave>\n"));
            xml.push_str("        </pitch>\n");
            xml.push_str(&format!(
                "        <duration>{}</duration>\n",
                duration_divisions(slice.duration)
            ));
            if slice.tie_start {
                xml.push_str("        <tie type=\"start\"/>\n");
            }
            if slice.tie_stop {
                xml.push_str("        <tie type=\"stop\"/>\n");
            }
            if let Some((name, dotted)) = duration_type(slice.duration) {
                xml.push_str(&format!("        <type>{name}</type>\n"));
                if dotted {
                    xml.push_str("        <dot/>\n");
                }
            }
            if slice.tie_start || slice.tie_stop {
                xml.push_str("        <notations>\n");
                if slice.tie_start {
                    xml.push_str("          <tied type=\"start\"/>\n");
                }
                if slice.tie_stop {
                    xml.push_str("          <tied type=\"stop\"/>\n");
                }
                xml.push_str("        </notations>\n");
            }
            if let Some(text) = lyric {
                if !slice.tie_stop {
                    xml.push_str("        <lyric number=\"1\">\n");
                    xml.push_str("          <syllabic>single</syllabic>\n");
                    xml.push_str(&format!("          <text>{}</text>\n", xml_escape(text)));
                    xml.push_str("        </lyric>\n");
                }
            }
            xml.push_str("      </note>\n");
        }
    }
}

fn write_rest(xml: &mut String, duration: f64) {
    xml.push_str("      <note>\n");
    xml.push_str("        <rest/>\n");
    xml.push_str(&format!(
        "        <duration>{}</duration>\n",
        duration_divisions(duration)
    ));
    if let Some((name, dotted)) = duration_type(duration) {
        xml.push_str(&format!("        <type>{name}</type>\n"));
        if dotted {
            xml.push_str("        <dot/>\n");
        }
    }
    xml.push_str("      </note>\n");
}

fn duration_divisions(quarters: f64) -> u32 {
    (quarters * DIVISIONS as f64).round().max(1.0) as u32
}

/// Note type for a duration, when one exists; odd tie remainders carry
/// only a numeric duration.
fn duration_type(quarters: f64) -> Option<(&'static str, bool)> {
    match duration_divisions(quarters) {
        1 => Some(("eighth", false)),
        2 => Some(("quarter", false)),
        3 => Some(("quarter", true)),
        4 => Some(("half", false)),
        6 => Some(("half", true)),
        8 => Some(("whole", false)),
        _ => None,
    }
}
