use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use std::collections::HashMap;

use crate::event::{Event, EventSequence, TimeSignature};
use crate::{Error, Result};

/// Parse Standard MIDI File bytes into a raw event sequence.
///
/// Note-on/note-off events are paired per (channel, pitch) with a stack so
/// overlapping same-pitch notes close in reverse order. Tick times are
/// converted to quarter-note units via the file's PPQ. The first time
/// signature meta event becomes the sequence's time signature, and the
/// first tempo meta is recorded as the source tempo.
pub fn import_midi(bytes: &[u8]) -> Result<EventSequence> {
    let smf = Smf::parse(bytes).map_err(|e| Error::Parse(format!("MIDI parse error: {}", e)))?;

    let ppq = match smf.header.timing {
        midly::Timing::Metrical(ticks) => ticks.as_int(),
        midly::Timing::Timecode(_, _) => 480,
    } as f64;

    let mut events = Vec::new();
    let mut time_signature: Option<TimeSignature> = None;
    let mut source_tempo_bpm: Option<f64> = None;

    for track in smf.tracks.iter() {
        let mut current_tick: u64 = 0;
        // (channel, pitch) → stack of onset ticks
        let mut pending: HashMap<(u8, u8), Vec<u64>> = HashMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                    if time_signature.is_none() {
                        // Denominator is 2^denom_pow; anything past 1/128
                        // does not fit a u8 and falls back to common time
                        let signature = match 2u32.checked_pow(denom_pow.into()) {
                            Some(denom) if denom <= u8::MAX as u32 => {
                                TimeSignature::new(num, denom as u8)
                            }
                            _ => TimeSignature::default(),
                        };
                        time_signature = Some(signature);
                    }
                }
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                    if source_tempo_bpm.is_none() {
                        let us = us_per_quarter.as_int();
                        if us > 0 {
                            source_tempo_bpm = Some(60_000_000.0 / us as f64);
                        }
                    }
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push(current_tick);
                        }
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            // vel=0 NoteOn is NoteOff
                            if let Some(stack) = pending.get_mut(&(ch, key.as_int())) {
                                if let Some(onset) = stack.pop() {
                                    push_note(&mut events, onset, current_tick, key.as_int(), ppq);
                                }
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Close any unclosed notes at the track's final tick
        for ((_, pitch), stack) in &pending {
            for &onset in stack {
                push_note(&mut events, onset, current_tick, *pitch, ppq);
            }
        }
    }

    let mut sequence = EventSequence::new(events, time_signature.unwrap_or_default());
    sequence.source_tempo_bpm = source_tempo_bpm;
    Ok(sequence)
}

fn push_note(events: &mut Vec<Event>, onset_tick: u64, offset_tick: u64, pitch: u8, ppq: f64) {
    if offset_tick <= onset_tick {
        return;
    }
    let onset = onset_tick as f64 / ppq;
    let duration = (offset_tick - onset_tick) as f64 / ppq;
    events.push(Event::note(onset, duration, pitch));
}
