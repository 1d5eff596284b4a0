//! Pitch estimation seams.
//!
//! The actual note-onset/pitch model is an external runtime dependency,
//! not embedded logic. Everything downstream talks to the `NoteEstimator`
//! trait, so the pipeline stays testable with a stub when no model is
//! installed.

use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::decode::{write_wav, AudioClip};
use crate::{Error, Result};

/// One detected note, in wall-clock seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEstimate {
    pub start: f64,
    pub end: f64,
    pub pitch: u8,
    pub confidence: f32,
}

/// Yields raw pitched events from audio, or reports unavailable.
pub trait NoteEstimator {
    fn estimate(&self, clip: &AudioClip) -> Result<Vec<NoteEstimate>>;
}

/// Runs an external transcription command (basic-pitch style): the clip is
/// written to a scratch WAV, the command is invoked with the WAV path and
/// an output directory, and whatever `.mid` file it leaves behind is read
/// back as the estimate.
///
/// A missing binary is a configuration condition, reported as
/// `Error::Unavailable` rather than a crash.
pub struct ExternalCommandEstimator {
    command: String,
    args: Vec<String>,
}

impl ExternalCommandEstimator {
    pub fn new(command: impl Into<String>) -> Self {
        ExternalCommandEstimator {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    fn find_midi(dir: &std::path::Path) -> Result<PathBuf> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::Unavailable(format!("cannot read estimator output: {e}")))?;
        for entry in entries {
            let path = entry
                .map_err(|e| Error::Unavailable(format!("cannot read estimator output: {e}")))?
                .path();
            let ext = path.extension().and_then(|e| e.to_str());
            if matches!(ext, Some("mid") | Some("midi")) {
                return Ok(path);
            }
        }
        Err(Error::Unavailable(
            "estimator produced no MIDI output".into(),
        ))
    }
}

impl NoteEstimator for ExternalCommandEstimator {
    fn estimate(&self, clip: &AudioClip) -> Result<Vec<NoteEstimate>> {
        let scratch = tempfile::tempdir()
            .map_err(|e| Error::Unavailable(format!("cannot create scratch dir: {e}")))?;
        let wav_path = scratch.path().join("input.wav");
        let out_dir = scratch.path().join("out");
        std::fs::create_dir(&out_dir)
            .map_err(|e| Error::Unavailable(format!("cannot create scratch dir: {e}")))?;

        write_wav(&wav_path, clip)?;

        tracing::debug!(command = %self.command, "invoking external pitch estimator");
        let status = Command::new(&self.command)
            .args(&self.args)
            .arg(&wav_path)
            .arg(&out_dir)
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::Unavailable(format!(
                        "transcription command '{}' not found; install it or pass a different \
                         command to transcribe audio",
                        self.command
                    ))
                } else {
                    Error::Unavailable(format!("failed to run '{}': {e}", self.command))
                }
            })?;

        if !status.success() {
            return Err(Error::Unavailable(format!(
                "transcription command '{}' exited with {status}",
                self.command
            )));
        }

        let midi_path = Self::find_midi(&out_dir)?;
        let bytes = std::fs::read(&midi_path)
            .map_err(|e| Error::Unavailable(format!("cannot read estimator MIDI: {e}")))?;
        let sequence = score_import::import_midi(&bytes)
            .map_err(|e| Error::Unavailable(format!("estimator MIDI unreadable: {e}")))?;

        // Estimator MIDI is written at 120 BPM, so one quarter is half a second
        Ok(sequence
            .events()
            .iter()
            .filter_map(|event| {
                event.pitch().map(|pitch| NoteEstimate {
                    start: event.onset * 0.5,
                    end: (event.onset + event.duration) * 0.5,
                    pitch,
                    confidence: 1.0,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_command_is_unavailable() {
        let clip = AudioClip {
            samples: vec![0.0; 100],
            sample_rate: 48000,
        };
        let estimator = ExternalCommandEstimator::new("definitely-not-a-real-binary-9f3a");
        let err = estimator.estimate(&clip).unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
        assert!(err.to_string().contains("not found"));
    }
}
