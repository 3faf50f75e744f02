// Message types exchanged with the dashboard page over the WebSocket.
//
// Text frames carry one JSON object each, tagged by a `type` field in both
// directions.

use serde::{Deserialize, Serialize};

use crate::aggregate::summary::{PitchTypeCount, PitchTypeVelocity};
use crate::aggregate::trend::TrendPoint;
use crate::lookup::PlayerQuery;
use crate::statcast::DateRange;

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// The page's single trigger action: compare two pitchers over a window.
    Compare {
        pitcher_a: PlayerQuery,
        pitcher_b: PlayerQuery,
        start_date: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
    },
}

impl ClientRequest {
    pub fn date_range(&self) -> DateRange {
        match self {
            ClientRequest::Compare {
                start_date,
                end_date,
                ..
            } => DateRange {
                start: *start_date,
                end: *end_date,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Comparison(ComparisonReport),
    Error { kind: ErrorKind, message: String },
}

/// Everything the page needs to render the comparison view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub pitcher_a: PitcherReport,
    pub pitcher_b: PitcherReport,
    pub trend: Vec<TrendPoint>,
}

/// Per-pitcher tables and chart inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitcherReport {
    pub label: String,
    pub pitch_counts: Vec<PitchTypeCount>,
    pub velocity_by_type: Vec<PitchTypeVelocity>,
    /// (plate_x, plate_z) pairs feeding the page's density estimate.
    pub locations: Vec<(f64, f64)>,
    /// Path of the CSV export artifact, filled in by the app layer once the
    /// artifact is on disk.
    pub export_path: Option<String>,
}

/// Failure categories the page words differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IdentityNotFound,
    EmptyDataSet,
    Transport,
    BadRequest,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
