// Plate-coordinate passthrough for the location heatmaps.
//
// The density surface itself is estimated by the page at render time; this
// module only selects the usable coordinate pairs.

use crate::statcast::PitchEvent;

/// (plate_x, plate_z) pairs for every event with both coordinates defined.
/// Rows missing either value cannot participate in the density estimate and
/// are excluded.
pub fn location_points(events: &[PitchEvent]) -> Vec<(f64, f64)> {
    events
        .iter()
        .filter_map(|e| match (e.plate_x, e.plate_z) {
            (Some(x), Some(z)) => Some((x, z)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(plate_x: Option<f64>, plate_z: Option<f64>) -> PitchEvent {
        PitchEvent {
            game_date: NaiveDate::from_ymd_opt(2025, 3, 28).unwrap(),
            pitch_type: Some("FF".to_string()),
            release_speed: Some(95.0),
            plate_x,
            plate_z,
        }
    }

    #[test]
    fn pairs_with_both_coordinates_pass_through_in_order() {
        let events = vec![
            event(Some(-0.5), Some(2.3)),
            event(Some(0.2), Some(1.8)),
        ];
        assert_eq!(location_points(&events), vec![(-0.5, 2.3), (0.2, 1.8)]);
    }

    #[test]
    fn rows_missing_either_coordinate_excluded() {
        let events = vec![
            event(Some(-0.5), Some(2.3)),
            event(None, Some(1.8)),
            event(Some(0.2), None),
            event(None, None),
        ];
        assert_eq!(location_points(&events), vec![(-0.5, 2.3)]);
    }

    #[test]
    fn empty_input_yields_no_points() {
        assert!(location_points(&[]).is_empty());
    }
}
