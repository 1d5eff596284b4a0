use crate::event::{Event, EventSequence, ONSET_EPSILON};

/// Collapse a possibly-polyphonic sequence to its top line: the single
/// highest-pitched note at each onset.
///
/// Events whose onsets differ by less than [`ONSET_EPSILON`] form one onset
/// group. Within a group a Note supersedes another Note only when its pitch
/// is strictly higher (ties keep the first seen), and any Note supersedes a
/// Rest. One representative is emitted per group, keeping its original
/// duration. This is a deliberate simplification, not voice separation.
pub fn reduce_top_line(seq: &EventSequence) -> EventSequence {
    let mut reduced: Vec<Event> = Vec::new();
    let mut current: Option<Event> = None;

    for event in seq.events() {
        match &mut current {
            None => current = Some(event.clone()),
            Some(rep) if (event.onset - rep.onset).abs() < ONSET_EPSILON => {
                let replace = match (rep.pitch(), event.pitch()) {
                    (Some(held), Some(candidate)) => candidate > held,
                    (None, Some(_)) => true,
                    _ => false,
                };
                if replace {
                    *rep = event.clone();
                }
            }
            Some(rep) => {
                reduced.push(rep.clone());
                current = Some(event.clone());
            }
        }
    }

    if let Some(rep) = current {
        reduced.push(rep);
    }

    let mut out = EventSequence::new(reduced, seq.time_signature);
    out.source_tempo_bpm = seq.source_tempo_bpm;
    out
}
