//! Symbolic score ingest.
//!
//! Turns MIDI, MusicXML, and ABC files into a single raw event model that
//! the rest of the pipeline consumes. Polyphonic input is reduced to its
//! top line on the way out, so downstream stages always see one voice.

pub mod abc;
pub mod event;
pub mod midi;
pub mod musicxml;
pub mod topline;

use std::path::Path;

pub use abc::import_abc;
pub use event::{Event, EventKind, EventSequence, NoteName, TimeSignature, ONSET_EPSILON};
pub use midi::import_midi;
pub use musicxml::import_musicxml;
pub use topline::reduce_top_line;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("PDF scores need optical music recognition first; export MusicXML or MIDI from your notation software instead")]
    NeedsOmr,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("file contained no notes or rests")]
    Empty,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Import a symbolic score by file extension and reduce it to a single
/// melodic line.
///
/// Recognized extensions: `.mid`/`.midi`, `.musicxml`/`.xml`, `.abc`.
/// PDF input is refused with a pointer toward OMR tooling.
pub fn import(bytes: &[u8], filename: &str) -> Result<EventSequence> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let sequence = match extension.as_str() {
        "mid" | "midi" => import_midi(bytes)?,
        "musicxml" | "xml" => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| Error::Parse(format!("MusicXML is not valid UTF-8: {e}")))?;
            import_musicxml(text)?
        }
        "abc" => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| Error::Parse(format!("ABC is not valid UTF-8: {e}")))?;
            import_abc(text)?
        }
        "pdf" => return Err(Error::NeedsOmr),
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    };

    if sequence.is_empty() {
        return Err(Error::Empty);
    }

    Ok(reduce_top_line(&sequence))
}
