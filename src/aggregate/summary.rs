// Per-pitch-type frequency and velocity summaries for a single pitcher.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::statcast::PitchEvent;

// ---------------------------------------------------------------------------
// Summary row types
// ---------------------------------------------------------------------------

/// One frequency-table row. `pitch_type` is `None` for events the provider
/// left unclassified; those form their own group rather than being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchTypeCount {
    pub pitch_type: Option<String>,
    pub count: usize,
}

/// One velocity-table row. `mean_release_speed` is `None` when no event in
/// the group carries a defined release speed — an undefined mean is reported
/// as such, never as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchTypeVelocity {
    pub pitch_type: Option<String>,
    pub mean_release_speed: Option<f64>,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Assign each event to a pitch-type group, preserving first-appearance
/// order. Returns the ordered group keys and, per group, the indices of its
/// member events.
fn group_by_pitch_type(events: &[PitchEvent]) -> Vec<(Option<String>, Vec<usize>)> {
    let mut order: Vec<Option<String>> = Vec::new();
    let mut members: HashMap<Option<String>, Vec<usize>> = HashMap::new();

    for (idx, event) in events.iter().enumerate() {
        let key = event.pitch_type.clone();
        let slot = members.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        slot.push(idx);
    }

    order
        .into_iter()
        .map(|key| {
            let idxs = members.remove(&key).unwrap_or_default();
            (key, idxs)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Public summaries
// ---------------------------------------------------------------------------

/// Count events per pitch type, in first-appearance order. Counts sum to the
/// input length: unclassified events are tallied under the `None` group.
pub fn count_by_pitch_type(events: &[PitchEvent]) -> Vec<PitchTypeCount> {
    group_by_pitch_type(events)
        .into_iter()
        .map(|(pitch_type, idxs)| PitchTypeCount {
            pitch_type,
            count: idxs.len(),
        })
        .collect()
}

/// Arithmetic mean of release speed per pitch type, in first-appearance
/// order. Events with a missing speed are excluded from their group's mean;
/// a group with no defined speeds reports `None`.
pub fn mean_velocity_by_pitch_type(events: &[PitchEvent]) -> Vec<PitchTypeVelocity> {
    group_by_pitch_type(events)
        .into_iter()
        .map(|(pitch_type, idxs)| {
            let speeds = idxs.iter().filter_map(|&i| events[i].release_speed);
            PitchTypeVelocity {
                pitch_type,
                mean_release_speed: mean(speeds),
            }
        })
        .collect()
}

/// Mean of an iterator of defined values; `None` when there are none.
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
