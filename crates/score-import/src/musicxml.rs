use roxmltree::{Document, Node, ParsingOptions};

use crate::event::{Event, EventSequence, TimeSignature};
use crate::{Error, Result};

/// Parse a MusicXML (score-partwise) document into a raw event sequence.
///
/// Walks every part measure by measure, tracking a quarter-note cursor
/// through `<note>`, `<backup>`, and `<forward>` elements, so multi-voice
/// parts yield correctly-overlapping events for later top-line reduction.
/// Grace notes carry no duration and are skipped.
pub fn import_musicxml(text: &str) -> Result<EventSequence> {
    let doc = Document::parse_with_options(
        text,
        ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )
    .map_err(|e| Error::Parse(format!("MusicXML parse error: {}", e)))?;

    let root = doc.root_element();
    if root.tag_name().name() != "score-partwise" {
        return Err(Error::Parse(format!(
            "unsupported MusicXML root element <{}>, expected <score-partwise>",
            root.tag_name().name()
        )));
    }

    let mut events = Vec::new();
    let mut time_signature: Option<TimeSignature> = None;

    for part in root.children().filter(|n| n.has_tag_name("part")) {
        // Divisions per quarter note, carried across measures and
        // redefinable in any <attributes>. The cursor stays in quarter
        // units so durations convert at the divisions in force when
        // they are read.
        let mut divisions: f64 = 1.0;
        let mut cursor: f64 = 0.0;
        // Onset of the most recent non-chord note, for <chord/> followers
        let mut last_onset: f64 = 0.0;

        for measure in part.children().filter(|n| n.has_tag_name("measure")) {
            for el in measure.children().filter(Node::is_element) {
                match el.tag_name().name() {
                    "attributes" => {
                        if let Some(d) = child_text_f64(&el, "divisions") {
                            if d > 0.0 {
                                divisions = d;
                            }
                        }
                        if let Some(time) = el.children().find(|n| n.has_tag_name("time")) {
                            let beats = child_text_f64(&time, "beats");
                            let beat_type = child_text_f64(&time, "beat-type");
                            if let (Some(n), Some(d)) = (beats, beat_type) {
                                if time_signature.is_none() {
                                    time_signature =
                                        Some(TimeSignature::new(n as u8, d as u8));
                                }
                            }
                        }
                    }
                    "note" => {
                        let is_grace = el.children().any(|n| n.has_tag_name("grace"));
                        if is_grace {
                            continue;
                        }
                        let duration_divs = child_text_f64(&el, "duration").ok_or_else(|| {
                            Error::Parse("note is missing <duration>".into())
                        })?;
                        let duration = duration_divs / divisions;
                        if duration <= 0.0 {
                            continue;
                        }

                        let is_chord = el.children().any(|n| n.has_tag_name("chord"));
                        let onset = if is_chord { last_onset } else { cursor };

                        if el.children().any(|n| n.has_tag_name("rest")) {
                            events.push(Event::rest(onset, duration));
                        } else {
                            let pitch = parse_pitch(&el)?;
                            events.push(Event::note(onset, duration, pitch));
                        }

                        if !is_chord {
                            last_onset = onset;
                            cursor += duration;
                        }
                    }
                    "backup" => {
                        if let Some(d) = child_text_f64(&el, "duration") {
                            cursor -= d / divisions;
                        }
                    }
                    "forward" => {
                        if let Some(d) = child_text_f64(&el, "duration") {
                            cursor += d / divisions;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(EventSequence::new(
        events,
        time_signature.unwrap_or_default(),
    ))
}

/// Convert a `<pitch>` element (step/alter/octave) to a MIDI pitch number.
fn parse_pitch(note: &Node) -> Result<u8> {
    let pitch = note
        .children()
        .find(|n| n.has_tag_name("pitch"))
        .ok_or_else(|| Error::Parse("note has neither <pitch> nor <rest>".into()))?;

    let step = pitch
        .children()
        .find(|n| n.has_tag_name("step"))
        .and_then(|n| n.text())
        .ok_or_else(|| Error::Parse("pitch is missing <step>".into()))?;

    let step_semitone = match step.trim() {
        "C" => 0,
        "D" => 2,
        "E" => 4,
        "F" => 5,
        "G" => 7,
        "A" => 9,
        "B" => 11,
        other => {
            return Err(Error::Parse(format!("invalid pitch step '{}'", other)));
        }
    };

    let alter = child_text_f64(&pitch, "alter").unwrap_or(0.0) as i32;
    let octave = child_text_f64(&pitch, "octave")
        .ok_or_else(|| Error::Parse("pitch is missing <octave>".into()))? as i32;

    let midi = (octave + 1) * 12 + step_semitone + alter;
    if !(0..=127).contains(&midi) {
        return Err(Error::Parse(format!(
            "pitch {}{} out of MIDI range",
            step, octave
        )));
    }
    Ok(midi as u8)
}

fn child_text_f64(node: &Node, name: &str) -> Option<f64> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wrap(measures: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Music</part-name></score-part>
  </part-list>
  <part id="P1">{}</part>
</score-partwise>"#,
            measures
        )
    }

    #[test]
    fn parses_notes_and_rests() {
        let xml = wrap(
            r#"<measure number="1">
                 <attributes>
                   <divisions>2</divisions>
                   <time><beats>4</beats><beat-type>4</beat-type></time>
                 </attributes>
                 <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration></note>
                 <note><rest/><duration>2</duration></note>
                 <note><pitch><step>F</step><alter>1</alter><octave>4</octave></pitch><duration>4</duration></note>
               </measure>"#,
        );

        let seq = import_musicxml(&xml).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.time_signature, TimeSignature::new(4, 4));

        assert_eq!(seq.events()[0].pitch(), Some(60));
        assert_eq!(seq.events()[0].duration, 1.0);
        assert!(!seq.events()[1].is_note());
        assert_eq!(seq.events()[2].pitch(), Some(66)); // F#4
        assert_eq!(seq.events()[2].onset, 2.0);
        assert_eq!(seq.events()[2].duration, 2.0);
    }

    #[test]
    fn chord_followers_share_onset() {
        let xml = wrap(
            r#"<measure number="1">
                 <attributes><divisions>1</divisions></attributes>
                 <note><pitch><step>C</step><octave>4</octave></pitch><duration>2</duration></note>
                 <note><chord/><pitch><step>G</step><octave>4</octave></pitch><duration>2</duration></note>
                 <note><pitch><step>D</step><octave>4</octave></pitch><duration>2</duration></note>
               </measure>"#,
        );

        let seq = import_musicxml(&xml).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.events()[0].onset, 0.0);
        assert_eq!(seq.events()[1].onset, 0.0);
        assert_eq!(seq.events()[2].onset, 2.0);
        assert_eq!(seq.events()[2].pitch(), Some(62));
    }

    #[test]
    fn backup_rewinds_the_cursor() {
        let xml = wrap(
            r#"<measure number="1">
                 <attributes><divisions>1</divisions></attributes>
                 <note><pitch><step>E</step><octave>5</octave></pitch><duration>4</duration></note>
                 <backup><duration>4</duration></backup>
                 <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration></note>
               </measure>"#,
        );

        let seq = import_musicxml(&xml).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.events()[0].onset, 0.0);
        assert_eq!(seq.events()[1].onset, 0.0);
    }

    #[test]
    fn mid_part_divisions_change_keeps_onsets_in_quarters() {
        let xml = wrap(
            r#"<measure number="1">
                 <attributes><divisions>1</divisions></attributes>
                 <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
               </measure>
               <measure number="2">
                 <attributes><divisions>2</divisions></attributes>
                 <note><pitch><step>D</step><octave>4</octave></pitch><duration>2</duration></note>
               </measure>"#,
        );

        let seq = import_musicxml(&xml).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.events()[1].onset, 1.0);
        assert_eq!(seq.events()[1].duration, 1.0);
    }

    #[test]
    fn grace_notes_are_skipped() {
        let xml = wrap(
            r#"<measure number="1">
                 <attributes><divisions>1</divisions></attributes>
                 <note><grace/><pitch><step>D</step><octave>4</octave></pitch></note>
                 <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
               </measure>"#,
        );

        let seq = import_musicxml(&xml).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.events()[0].pitch(), Some(60));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = import_musicxml("<score-partwise><part").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn timewise_root_is_rejected() {
        let err = import_musicxml("<score-timewise/>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
