//! Audio to note events.
//!
//! Decodes audio bytes to a mono clip, runs a pluggable pitch estimator
//! over it, and applies the fixed transcription policy: a 120 BPM
//! time-to-quarters heuristic, a minimum-length gate, half-quarter
//! rounding, and last-detected-wins on duplicate onsets.

pub mod decode;
pub mod estimator;

pub use decode::{decode_audio, write_wav, AudioClip};
pub use estimator::{ExternalCommandEstimator, NoteEstimate, NoteEstimator};

use score_import::{Event, EventSequence, TimeSignature, ONSET_EPSILON};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("transcription unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Estimates shorter than this many quarters are detector noise.
const MIN_QUARTERS: f64 = 0.125;

/// Assumed tempo for the seconds-to-quarters conversion, in BPM.
const ASSUMED_BPM: f64 = 120.0;

/// Turn raw note estimates into a quantized monophonic event sequence.
///
/// Policy, in order: map seconds to quarters at 120 BPM; drop events with
/// quantized length at or below 0.125 quarters; round the rest to the
/// nearest half quarter with a floor of 0.25; sort by onset; when two
/// estimates land on the same onset the last detected one wins.
pub fn events_from_estimates(estimates: &[NoteEstimate]) -> EventSequence {
    let quarters_per_second = ASSUMED_BPM / 60.0;

    let mut events: Vec<Event> = Vec::new();
    for estimate in estimates {
        let quarters = (estimate.end - estimate.start) * quarters_per_second;
        if quarters <= MIN_QUARTERS {
            tracing::trace!(pitch = estimate.pitch, quarters, "dropping sub-threshold note");
            continue;
        }
        let duration = ((quarters * 2.0).round() / 2.0).max(0.25);
        let onset = estimate.start * quarters_per_second;

        match events
            .iter_mut()
            .find(|e| (e.onset - onset).abs() < ONSET_EPSILON)
        {
            Some(existing) => {
                // Last detected wins on a duplicate onset
                *existing = Event::note(onset, duration, estimate.pitch);
            }
            None => events.push(Event::note(onset, duration, estimate.pitch)),
        }
    }

    EventSequence::new(events, TimeSignature::default())
}

/// Decode audio bytes and transcribe them with the given estimator.
pub fn transcribe(bytes: &[u8], estimator: &dyn NoteEstimator) -> Result<EventSequence> {
    let clip = decode_audio(bytes)?;
    tracing::debug!(
        seconds = clip.duration_seconds(),
        sample_rate = clip.sample_rate,
        "decoded audio"
    );
    let estimates = estimator.estimate(&clip)?;
    tracing::debug!(count = estimates.len(), "estimator returned notes");
    Ok(events_from_estimates(&estimates))
}
