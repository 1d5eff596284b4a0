//! Score serialization for external renderers.
//!
//! The core produces bytes plus a suggested filename and MIME type; how
//! the artifact is served or drawn is someone else's problem.

mod abc;
mod musicxml;

pub use abc::export_abc;
pub use musicxml::export_musicxml;

use score_import::{EventKind, EventSequence, ONSET_EPSILON};

use crate::score::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    MusicXml,
    Abc,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::MusicXml => "musicxml",
            ExportFormat::Abc => "abc",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::MusicXml => "application/vnd.recordare.musicxml+xml",
            ExportFormat::Abc => "text/vnd.abc",
        }
    }
}

/// Serialized score ready for download.
#[derive(Debug, Clone)]
pub struct ScoreArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: &'static str,
}

pub fn suggested_filename(score: &Score, format: ExportFormat) -> String {
    let stem = if score.accompaniment.is_some() {
        "score_c_major_with_acc"
    } else {
        "melody_c_major"
    };
    format!("{stem}.{}", format.extension())
}

/// Serialize a score in the requested format.
pub fn export(score: &Score, format: ExportFormat) -> ScoreArtifact {
    let bytes = match format {
        ExportFormat::MusicXml => export_musicxml(score).into_bytes(),
        ExportFormat::Abc => export_abc(score).into_bytes(),
    };
    ScoreArtifact {
        bytes,
        filename: suggested_filename(score, format),
        mime_type: format.mime_type(),
    }
}

/// A fragment of an event confined to one measure. Events that cross a
/// barline become tied slices.
#[derive(Debug, Clone)]
pub(crate) struct Slice {
    pub onset: f64,
    pub duration: f64,
    pub kind: EventKind,
    pub tie_start: bool,
    pub tie_stop: bool,
}

/// Cut a sequence into per-measure slice lists, at least `min_measures`
/// long so parallel parts stay the same length.
pub(crate) fn split_measures(sequence: &EventSequence, min_measures: usize) -> Vec<Vec<Slice>> {
    let bar = sequence.time_signature.bar_quarters();
    let span = sequence.span_quarters();
    let count = ((span / bar).ceil() as usize).max(min_measures).max(1);

    let mut measures: Vec<Vec<Slice>> = vec![Vec::new(); count];

    for event in sequence.events() {
        let is_note = event.is_note();
        let mut start = event.onset;
        let mut remaining = event.duration;

        while remaining > ONSET_EPSILON {
            let measure = ((start + ONSET_EPSILON) / bar).floor() as usize;
            if measure >= count {
                break;
            }
            let room = (measure as f64 + 1.0) * bar - start;
            let take = room.min(remaining);

            measures[measure].push(Slice {
                onset: start,
                duration: take,
                kind: event.kind.clone(),
                tie_start: is_note && remaining - take > ONSET_EPSILON,
                tie_stop: is_note && start - event.onset > ONSET_EPSILON,
            });

            start += take;
            remaining -= take;
        }
    }

    measures
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use score_import::{Event, TimeSignature};

    use crate::pipeline::{assemble, AssembleOptions};

    fn sample_score(with_accompaniment: bool) -> Score {
        let raw = EventSequence::new(
            vec![Event::note(0.0, 1.0, 60), Event::note(1.0, 1.0, 62)],
            TimeSignature::default(),
        );
        assemble(
            &raw,
            AssembleOptions {
                with_accompaniment,
                with_solfege: true,
            },
        )
    }

    #[test]
    fn filenames_track_accompaniment() {
        assert_eq!(
            suggested_filename(&sample_score(true), ExportFormat::MusicXml),
            "score_c_major_with_acc.musicxml"
        );
        assert_eq!(
            suggested_filename(&sample_score(false), ExportFormat::MusicXml),
            "melody_c_major.musicxml"
        );
        assert_eq!(
            suggested_filename(&sample_score(false), ExportFormat::Abc),
            "melody_c_major.abc"
        );
    }

    #[test]
    fn artifact_carries_mime_type() {
        let artifact = export(&sample_score(true), ExportFormat::MusicXml);
        assert_eq!(artifact.mime_type, "application/vnd.recordare.musicxml+xml");
        assert!(!artifact.bytes.is_empty());
    }

    #[test]
    fn crossing_events_become_tied_slices() {
        let seq = EventSequence::new(
            vec![Event::note(0.0, 3.0, 60), Event::note(3.0, 2.0, 62)],
            TimeSignature::default(),
        );
        let measures = split_measures(&seq, 1);
        assert_eq!(measures.len(), 2);

        // Second note crosses into measure 1
        assert_eq!(measures[0].len(), 2);
        assert!(measures[0][1].tie_start);
        assert!(!measures[0][1].tie_stop);
        assert_eq!(measures[0][1].duration, 1.0);

        assert_eq!(measures[1].len(), 1);
        assert!(measures[1][0].tie_stop);
        assert_eq!(measures[1][0].duration, 1.0);
    }

    #[test]
    fn min_measures_pads_with_empty_lists() {
        let seq = EventSequence::new(
            vec![Event::note(0.0, 1.0, 60)],
            TimeSignature::default(),
        );
        let measures = split_measures(&seq, 3);
        assert_eq!(measures.len(), 3);
        assert!(measures[1].is_empty());
        assert!(measures[2].is_empty());
    }
}
