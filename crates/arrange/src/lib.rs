//! Arrangement pipeline for elementary-level scores.
//!
//! Takes a raw monophonic event sequence (from transcription or score
//! import), simplifies it into beginner-readable note values in the
//! C4..C5 range, transposes it to C, picks a chord per measure, renders
//! block-chord accompaniment and solfège lyrics, and serializes the
//! result for an external renderer.
//!
//! All stages are infallible by design: recoverable conditions (key
//! detection on thin input, empty melodies) degrade in place instead of
//! failing the request.

pub mod chords;
pub mod export;
pub mod key;
pub mod pipeline;
pub mod score;
pub mod simplify;
pub mod solfege;

pub use export::{export, suggested_filename, ExportFormat, ScoreArtifact};
pub use key::{detect_key, normalize_to_c, Key, KeyMode};
pub use pipeline::{assemble, AssembleOptions};
pub use score::{ChordLabel, MeasureChord, Score, OUTPUT_TEMPO_BPM};
