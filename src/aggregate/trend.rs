// Combined velocity-over-time series for two labeled event sets.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::summary::mean;
use crate::statcast::PitchEvent;

/// Mean release speed for one (date, pitcher) pair. `mean_release_speed`
/// follows the same missing-value policy as the per-type summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub pitcher: String,
    pub mean_release_speed: Option<f64>,
}

/// Union the two labeled event sets, group by (date, pitcher), and compute
/// the per-group mean release speed. Output is sorted by date ascending with
/// ties broken by pitcher label, so the series is deterministic.
pub fn trend_over_time(
    label_a: &str,
    events_a: &[PitchEvent],
    label_b: &str,
    events_b: &[PitchEvent],
) -> Vec<TrendPoint> {
    // Group-assignment pass over the union.
    let mut groups: HashMap<(NaiveDate, &str), Vec<Option<f64>>> = HashMap::new();
    let labeled = events_a
        .iter()
        .map(|e| (label_a, e))
        .chain(events_b.iter().map(|e| (label_b, e)));
    for (label, event) in labeled {
        groups
            .entry((event.game_date, label))
            .or_default()
            .push(event.release_speed);
    }

    // Reduction pass.
    let mut points: Vec<TrendPoint> = groups
        .into_iter()
        .map(|((date, pitcher), speeds)| TrendPoint {
            date,
            pitcher: pitcher.to_string(),
            mean_release_speed: mean(speeds.into_iter().flatten()),
        })
        .collect();

    points.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.pitcher.cmp(&b.pitcher)));
    points
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
